//! Health check endpoint.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::{Json, Router, routing::get};
use emberwake_core::event::EventName;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Fingerprint of the loaded content.
    pub content_fingerprint: String,
    /// Handlers per event name.
    pub subscribers: BTreeMap<EventName, usize>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        content_fingerprint: state.runtime.fingerprint().to_owned(),
        subscribers: state.runtime.subscriber_counts(),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
