use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers::assets;
use crate::api::state::AppState;
use crate::core::merge::MAX_UPLOAD_BYTES;

/// Asset routes mounted at `/assets`.
///
/// The upload route accepts bodies slightly above [`MAX_UPLOAD_BYTES`]; the
/// merge itself enforces the limit.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/upload",
            post(assets::upload_assets).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route(
            "/{id}",
            get(assets::get_asset)
                .put(assets::update_asset)
                .patch(assets::patch_asset)
                .delete(assets::delete_asset),
        )
        .route("/{id}/history", get(assets::asset_history))
}
