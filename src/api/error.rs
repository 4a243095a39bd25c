use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::utils::error::RegistryError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`RegistryError`] for domain errors and adds HTTP-specific variants.
/// Renders as `{ "error": message, "code": CODE }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Registry(err) => classify_registry_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_registry_error(err: &RegistryError) -> (StatusCode, &'static str, String) {
    match err {
        RegistryError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        RegistryError::ValidationError { message } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
        }
        RegistryError::CsvError(_) => (StatusCode::BAD_REQUEST, "INVALID_CSV", err.to_string()),
        RegistryError::FileTooLarge { .. } => {
            (StatusCode::BAD_REQUEST, "FILE_TOO_LARGE", err.to_string())
        }
        RegistryError::Conflict { message } => (StatusCode::CONFLICT, "CONFLICT", message.clone()),
        RegistryError::NoRawAsset { .. } | RegistryError::MultipleRawAssets { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "UNRESOLVABLE_RAW_ASSET",
            err.to_string(),
        ),
        RegistryError::QueryTooLong { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "QUERY_TOO_LONG",
            err.to_string(),
        ),
        RegistryError::ApiError(_)
        | RegistryError::GeocodingError { .. }
        | RegistryError::CartoError { .. } => {
            tracing::warn!(error = %err, "Upstream service error");
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Registry error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
