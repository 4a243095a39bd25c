//! Handlers shared by the name-keyed lookup tables (asset types, categories).
//!
//! Each takes the [`LookupKind`] it serves; the routes bind it.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::api::error::AppResult;
use crate::api::response::DataResponse;
use crate::api::state::AppState;
use crate::domain::model::{Id, LookupEntry, LookupKind, NewLookup};

pub async fn list_entries(state: AppState, kind: LookupKind) -> AppResult<impl IntoResponse> {
    let entries = state.registry.list_lookup(kind).await?;
    Ok(Json(DataResponse { data: entries }))
}

pub async fn create_entry(
    state: AppState,
    kind: LookupKind,
    input: NewLookup,
) -> AppResult<(StatusCode, Json<DataResponse<LookupEntry>>)> {
    let entry = state.registry.insert_lookup(kind, input).await?;
    state.persist().await?;

    tracing::info!(kind = kind.entity_name(), id = entry.id, "Lookup entry created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

pub async fn get_entry(state: AppState, kind: LookupKind, id: Id) -> AppResult<impl IntoResponse> {
    let entry = state.registry.get_lookup(kind, id).await?;
    Ok(Json(DataResponse { data: entry }))
}

pub async fn update_entry(
    state: AppState,
    kind: LookupKind,
    id: Id,
    input: NewLookup,
) -> AppResult<impl IntoResponse> {
    let replacement = LookupEntry {
        id,
        name: input.name,
        title: input.title,
        category_id: input.category_id,
        url: input.url,
    };
    let entry = state.registry.update_lookup(kind, &replacement).await?;
    state.persist().await?;

    tracing::info!(kind = kind.entity_name(), id, "Lookup entry updated");

    Ok(Json(DataResponse { data: entry }))
}

pub async fn delete_entry(state: AppState, kind: LookupKind, id: Id) -> AppResult<StatusCode> {
    state.registry.delete_lookup(kind, id).await?;
    state.persist().await?;

    tracing::info!(kind = kind.entity_name(), id, "Lookup entry deleted");

    Ok(StatusCode::NO_CONTENT)
}

