//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use emberwake_core::rng::DeterministicRng;
use emberwake_store::MemoryRecordStore;
use emberwake_test_support::{FixedClock, MockRng};
use http_body_util::BodyExt;
use tower::ServiceExt;

use emberwake_api::routes;
use emberwake_api::runtime::NarrativeRuntime;
use emberwake_api::state::AppState;

/// Build the full app router over the repository's `content/` directory and
/// in-memory storage, with a pinned clock.
pub fn build_test_app() -> Router {
    build_test_app_with_rng(Box::new(MockRng))
}

/// Same as [`build_test_app`] with a custom level-up RNG.
pub fn build_test_app_with_rng(rng: Box<dyn DeterministicRng>) -> Router {
    let content_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content");
    let content = emberwake_content::load_dir(&content_dir).unwrap();
    let runtime = NarrativeRuntime::new(
        content,
        Arc::new(MemoryRecordStore::new()),
        Arc::new(FixedClock::ticking(FixedClock::default_instant())),
        rng,
    );
    routes::router().with_state(AppState::new(runtime))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Publish a collaborator event through the ingress route.
pub async fn publish(
    app: Router,
    name: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app,
        "/api/v1/events",
        &serde_json::json!({ "name": name, "payload": payload }),
    )
    .await
}
