//! HTTP API over the registry (axum).

pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod serializers;
pub mod state;

pub use router::build_app_router;
pub use state::AppState;
