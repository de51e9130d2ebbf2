//! Routes for reading and administering flags.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::delete, routing::get};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use emberwake_flags::Flag;

use crate::error::ApiError;
use crate::routes::{Envelope, ok};
use crate::state::AppState;

/// Response body for flag removal.
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    /// Number of flags removed.
    pub removed: u64,
}

/// GET /{subject_id}
#[instrument(skip(state))]
async fn list_flags(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<Flag>>>, ApiError> {
    Ok(ok(state.runtime.flags(subject_id).await?))
}

/// DELETE /{subject_id}
#[instrument(skip(state))]
async fn reset_flags(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<RemovedResponse>>, ApiError> {
    let removed = state.runtime.reset_flags(subject_id).await?;
    info!(removed, "flags reset by admin");
    Ok(ok(RemovedResponse { removed }))
}

/// DELETE /{subject_id}/{flag}
#[instrument(skip(state))]
async fn remove_flag(
    State(state): State<AppState>,
    Path((subject_id, flag)): Path<(Uuid, String)>,
) -> Result<Json<Envelope<RemovedResponse>>, ApiError> {
    let removed = state.runtime.remove_flag(subject_id, &flag).await?;
    Ok(ok(RemovedResponse {
        removed: u64::from(removed),
    }))
}

/// Returns the router for flags.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{subject_id}", get(list_flags).delete(reset_flags))
        .route("/{subject_id}/{flag}", delete(remove_flag))
}
