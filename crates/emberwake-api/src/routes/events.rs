//! Event ingress for collaborators.
//!
//! Combat, exploration and item systems report what happened to a subject
//! here; the event is published on the bus like any other.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use emberwake_core::event::{EventName, WorldEventKind};

use crate::error::ApiError;
use crate::routes::{Envelope, ok};
use crate::state::AppState;

/// Response body for a published event.
#[derive(Debug, Serialize)]
pub struct PublishedResponse {
    /// Identifier of the published event.
    pub event_id: Uuid,
    /// Event name.
    pub name: EventName,
}

/// POST /
#[instrument(skip(state, event), fields(event = %event.name(), subject_id = %event.subject_id()))]
async fn publish_event(
    State(state): State<AppState>,
    Json(event): Json<WorldEventKind>,
) -> Result<Json<Envelope<PublishedResponse>>, ApiError> {
    let event = state.runtime.publish(event).await?;
    Ok(ok(PublishedResponse {
        event_id: event.metadata.event_id,
        name: event.name(),
    }))
}

/// Returns the router for event ingress.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(publish_event))
}
