#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use asset_registry::api::{build_app_router, AppState};
use asset_registry::domain::model::Geocode;
use asset_registry::domain::ports::{Geocoder, Registry};
use asset_registry::utils::error::Result;
use asset_registry::{AppConfig, InMemoryRegistry, LocalStorage, SnapshotStore};

/// Geocoder that never finds anything.
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    fn provider(&self) -> &str {
        "Nobody"
    }

    async fn geocode(&self, _full_address: &str) -> Result<Option<Geocode>> {
        Ok(None)
    }
}

/// Build the full application router over `registry`, without persistence.
pub fn build_test_app(registry: Arc<InMemoryRegistry>) -> Router {
    let registry: Arc<dyn Registry> = registry;
    let state = AppState::new(registry, Arc::new(NullGeocoder), None, AppConfig::default());
    build_app_router(state)
}

/// Like [`build_test_app`], but every write is saved through `snapshots`.
pub fn build_persistent_test_app(
    registry: Arc<InMemoryRegistry>,
    snapshots: SnapshotStore<LocalStorage>,
) -> Router {
    let registry: Arc<dyn Registry> = registry;
    let state = AppState::new(
        registry,
        Arc::new(NullGeocoder),
        Some(snapshots),
        AppConfig::default(),
    );
    build_app_router(state)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty(), None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty(), None).await
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    send_json(app, Method::POST, uri, json).await
}

pub async fn put_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, json).await
}

pub async fn patch_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    send_json(app, Method::PATCH, uri, json).await
}

async fn send_json(app: Router, method: Method, uri: &str, json: serde_json::Value) -> Response<Body> {
    send(
        app,
        method,
        uri,
        Body::from(json.to_string()),
        Some("application/json".to_string()),
    )
    .await
}

pub const BOUNDARY: &str = "asset-registry-test-boundary";

/// Multipart body with text fields followed by a `file` part.
pub fn multipart_body(fields: &[(&str, &str)], file: &str) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"merge.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{file}\r\n--{BOUNDARY}--\r\n"
    ));
    body
}

pub async fn post_multipart(app: Router, uri: &str, body: String) -> Response<Body> {
    send(
        app,
        Method::POST,
        uri,
        Body::from(body),
        Some(format!("multipart/form-data; boundary={BOUNDARY}")),
    )
    .await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Body,
    content_type: Option<String>,
) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    app.oneshot(request.body(body).expect("valid request"))
        .await
        .expect("router is infallible")
}
