use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::locations;
use crate::api::state::AppState;

/// Location routes mounted at `/locations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/{id}",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/{id}/split", post(locations::split_location))
        .route("/{id}/history", get(locations::location_history))
}
