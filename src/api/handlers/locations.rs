//! Handlers for locations and the location split repair.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::error::AppResult;
use crate::api::handlers::API_CHANGE_REASON;
use crate::api::query::{PaginationParams, SplitParams};
use crate::api::response::DataResponse;
use crate::api::state::AppState;
use crate::core::split::LocationSplitter;
use crate::domain::model::{Id, Location, NewLocation};

/// GET /api/v1/locations
pub async fn list_locations(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let page = state.registry.list_locations(params.page()).await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /api/v1/locations
pub async fn create_location(
    State(state): State<AppState>,
    Json(input): Json<NewLocation>,
) -> AppResult<(StatusCode, Json<DataResponse<Location>>)> {
    let location = state
        .registry
        .insert_location(input, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(location_id = location.id, "Location created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: location })))
}

/// GET /api/v1/locations/{id}
pub async fn get_location(
    State(state): State<AppState>,
    Path(location_id): Path<Id>,
) -> AppResult<impl IntoResponse> {
    let location = state.registry.get_location(location_id).await?;
    Ok(Json(DataResponse { data: location }))
}

/// PUT /api/v1/locations/{id}
pub async fn update_location(
    State(state): State<AppState>,
    Path(location_id): Path<Id>,
    Json(input): Json<NewLocation>,
) -> AppResult<impl IntoResponse> {
    let replacement = Location {
        id: location_id,
        name: input.name,
        fields: input.fields,
    };
    let location = state
        .registry
        .update_location(&replacement, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(location_id, "Location replaced");

    Ok(Json(DataResponse { data: location }))
}

/// DELETE /api/v1/locations/{id}
///
/// Assets at the location are unlinked, not deleted.
pub async fn delete_location(
    State(state): State<AppState>,
    Path(location_id): Path<Id>,
) -> AppResult<StatusCode> {
    state
        .registry
        .delete_location(location_id, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(location_id, "Location deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/locations/{id}/split?dry_run=
///
/// Re-derives the location of every asset sharing this location from its
/// raw asset. A dry run reports the outcome without writing. On failure the
/// writes made for earlier assets are still persisted.
pub async fn split_location(
    State(state): State<AppState>,
    Path(location_id): Path<Id>,
    Query(params): Query<SplitParams>,
) -> AppResult<impl IntoResponse> {
    let splitter = LocationSplitter::new(
        state.registry.as_ref(),
        state.geocoder.as_ref(),
        state.split_options(),
    );
    let result = splitter.split_location(location_id, params.dry_run).await;
    if !params.dry_run {
        // Assets handled before a failure keep their new locations.
        state.persist().await?;
    }
    let report = result?;

    tracing::info!(
        location_id,
        dry_run = params.dry_run,
        handled = report.handled,
        "Location split"
    );

    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/locations/{id}/history
pub async fn location_history(
    State(state): State<AppState>,
    Path(location_id): Path<Id>,
) -> AppResult<impl IntoResponse> {
    state.registry.get_location(location_id).await?;
    let history = state.registry.history("Location", location_id).await?;
    Ok(Json(DataResponse { data: history }))
}
