pub mod assets;
pub mod health;
pub mod locations;
pub mod lookups;

use axum::Router;

use crate::api::state::AppState;
use crate::domain::model::LookupKind;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /assets                         list (search, limit, offset, fmt), create
/// /assets/upload                  CSV merge upload (multipart)
/// /assets/{id}                    get (fmt), replace, patch, delete
/// /assets/{id}/history            change history
///
/// /asset-types                    list, create
/// /asset-types/{id}               get, replace, delete
/// /categories                     list, create
/// /categories/{id}                get, replace, delete
///
/// /locations                      list (limit, offset), create
/// /locations/{id}                 get, replace, delete
/// /locations/{id}/split           split repair (POST, ?dry_run=)
/// /locations/{id}/history         change history
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::router())
        .nest("/asset-types", lookups::router(LookupKind::AssetType))
        .nest("/categories", lookups::router(LookupKind::Category))
        .nest("/locations", locations::router())
}
