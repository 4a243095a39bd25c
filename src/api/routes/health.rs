use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::api::state::AppState;
use crate::domain::model::AssetFilter;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the registry answered a trivial query.
    pub registry_healthy: bool,
    pub geocoder: String,
    pub persistent: bool,
}

/// GET /health -- returns service and registry health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry_healthy = state
        .registry
        .list_assets(&AssetFilter::default())
        .await
        .is_ok();

    let status = if registry_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        registry_healthy,
        geocoder: state.geocoder.provider().to_string(),
        persistent: state.snapshots.is_some(),
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
