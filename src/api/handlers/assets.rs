//! Handlers for assets, including the CSV merge upload.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::{AppError, AppResult};
use crate::api::handlers::API_CHANGE_REASON;
use crate::api::query::{AssetListParams, FormatParams};
use crate::api::response::DataResponse;
use crate::api::serializers::{
    self, AssetDetail, AssetListItem, Feature, FeatureCollection, LookupNames,
};
use crate::api::state::AppState;
use crate::core::merge::{MergeMode, MergeUploader};
use crate::domain::model::{Asset, AssetFilter, Id, NewAsset, Page};

/// GET /api/v1/assets
///
/// Paginated list with optional `search` on the name. `fmt=geojson` returns
/// a FeatureCollection of the page instead.
pub async fn list_assets(
    State(state): State<AppState>,
    Query(params): Query<AssetListParams>,
) -> AppResult<Response> {
    let filter = AssetFilter {
        search: params.search.clone(),
        page: params.page(),
    };
    let page = state.registry.list_assets(&filter).await?;
    let names = LookupNames::load(state.registry.as_ref()).await?;

    let mut items = Vec::with_capacity(page.results.len());
    for asset in page.results {
        items.push(serializers::list_item(state.registry.as_ref(), &names, asset).await?);
    }

    if params.wants_geojson() {
        let collection: FeatureCollection<_> = items
            .into_iter()
            .map(Feature::<AssetListItem>::from)
            .collect();
        return Ok(Json(DataResponse { data: collection }).into_response());
    }

    let page = Page {
        count: page.count,
        limit: page.limit,
        offset: page.offset,
        results: items,
    };
    Ok(Json(DataResponse { data: page }).into_response())
}

/// POST /api/v1/assets
pub async fn create_asset(
    State(state): State<AppState>,
    Json(input): Json<NewAsset>,
) -> AppResult<(StatusCode, Json<DataResponse<AssetDetail>>)> {
    let asset = state
        .registry
        .insert_asset(input, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(asset_id = asset.id, "Asset created");

    let detail = serializers::detail(state.registry.as_ref(), asset).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Id>,
    Query(format): Query<FormatParams>,
) -> AppResult<Response> {
    let asset = state.registry.get_asset(asset_id).await?;
    let detail = serializers::detail(state.registry.as_ref(), asset).await?;

    if format.wants_geojson() {
        return Ok(Json(DataResponse {
            data: Feature::<AssetDetail>::from(detail),
        })
        .into_response());
    }
    Ok(Json(DataResponse { data: detail }).into_response())
}

/// PUT /api/v1/assets/{id}
pub async fn update_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Id>,
    Json(input): Json<NewAsset>,
) -> AppResult<impl IntoResponse> {
    let asset = state
        .registry
        .update_asset(&input.into_asset(asset_id), API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(asset_id, "Asset replaced");

    let detail = serializers::detail(state.registry.as_ref(), asset).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/v1/assets/{id}
///
/// Top-level keys of the body replace the stored values; `id` is ignored.
pub async fn patch_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Id>,
    Json(patch): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let serde_json::Value::Object(changes) = patch else {
        return Err(AppError::BadRequest(
            "PATCH body must be a JSON object".to_string(),
        ));
    };

    let current = state.registry.get_asset(asset_id).await?;
    let mut merged = serde_json::to_value(&current)
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    if let serde_json::Value::Object(fields) = &mut merged {
        for (key, value) in changes {
            if key != "id" {
                fields.insert(key, value);
            }
        }
    }
    let patched: Asset =
        serde_json::from_value(merged).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let asset = state
        .registry
        .update_asset(&patched, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(asset_id, "Asset patched");

    let detail = serializers::detail(state.registry.as_ref(), asset).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/assets/{id}
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<Id>,
) -> AppResult<StatusCode> {
    state
        .registry
        .delete_asset(asset_id, API_CHANGE_REASON)
        .await?;
    state.persist().await?;

    tracing::info!(asset_id, "Asset deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/assets/{id}/history
pub async fn asset_history(
    State(state): State<AppState>,
    Path(asset_id): Path<Id>,
) -> AppResult<impl IntoResponse> {
    state.registry.get_asset(asset_id).await?;
    let history = state.registry.history("Asset", asset_id).await?;
    Ok(Json(DataResponse { data: history }))
}

/// POST /api/v1/assets/upload
///
/// Multipart form with a `file` CSV. `mode=validate` (or any `validate`
/// field) only reports the changes; otherwise they are applied.
pub async fn upload_assets(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file = None;
    let mut mode = MergeMode::Update;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some(data);
            }
            "mode" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                mode = match value.trim() {
                    "validate" => MergeMode::Validate,
                    "update" | "" => mode,
                    other => {
                        return Err(AppError::BadRequest(format!(
                            "Unknown mode '{other}', expected 'validate' or 'update'"
                        )))
                    }
                };
            }
            "validate" => mode = MergeMode::Validate,
            _ => {}
        }
    }

    let data = file.ok_or_else(|| {
        AppError::BadRequest("No 'file' field received in multipart upload".to_string())
    })?;

    let report = MergeUploader::new(state.registry.as_ref())
        .process(&data, mode)
        .await?;
    if mode == MergeMode::Update {
        state.persist().await?;
    }

    tracing::info!(
        rows = report.rows_processed,
        aborted = report.aborted,
        "Merge upload finished"
    );

    Ok(Json(DataResponse { data: report }))
}
