use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::handlers::lookups;
use crate::api::state::AppState;
use crate::domain::model::{Id, LookupKind, NewLookup};

/// CRUD routes for one lookup table, e.g. `/asset-types` or `/categories`.
pub fn router(kind: LookupKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| lookups::list_entries(state, kind)).post(
                move |State(state): State<AppState>, Json(input): Json<NewLookup>| {
                    lookups::create_entry(state, kind, input)
                },
            ),
        )
        .route(
            "/{id}",
            get(move |State(state): State<AppState>, Path(id): Path<Id>| {
                lookups::get_entry(state, kind, id)
            })
            .put(
                move |State(state): State<AppState>,
                      Path(id): Path<Id>,
                      Json(input): Json<NewLookup>| {
                    lookups::update_entry(state, kind, id, input)
                },
            )
            .delete(move |State(state): State<AppState>, Path(id): Path<Id>| {
                lookups::delete_entry(state, kind, id)
            }),
        )
}
