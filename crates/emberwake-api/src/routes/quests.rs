//! Routes for the Quests context.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use emberwake_quests::application::query_handlers::{AvailableQuestView, QuestLogEntry};
use emberwake_quests::domain::progress::QuestProgress;

use crate::error::ApiError;
use crate::routes::{Envelope, ok};
use crate::state::AppState;

/// Request body for POST /accept and POST /abandon.
#[derive(Debug, Deserialize)]
pub struct QuestRequest {
    /// The subject.
    pub subject_id: Uuid,
    /// The quest.
    pub quest_id: String,
}

/// POST /accept
#[instrument(skip(state, request), fields(subject_id = %request.subject_id, quest_id = %request.quest_id))]
async fn accept_quest(
    State(state): State<AppState>,
    Json(request): Json<QuestRequest>,
) -> Result<Json<Envelope<QuestProgress>>, ApiError> {
    Ok(ok(state
        .runtime
        .accept_quest(request.subject_id, &request.quest_id)
        .await?))
}

/// POST /abandon
#[instrument(skip(state, request), fields(subject_id = %request.subject_id, quest_id = %request.quest_id))]
async fn abandon_quest(
    State(state): State<AppState>,
    Json(request): Json<QuestRequest>,
) -> Result<Json<Envelope<QuestProgress>>, ApiError> {
    Ok(ok(state
        .runtime
        .abandon_quest(request.subject_id, &request.quest_id)
        .await?))
}

/// GET /{subject_id}
#[instrument(skip(state))]
async fn quest_log(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<QuestLogEntry>>>, ApiError> {
    Ok(ok(state.runtime.quest_log(subject_id).await?))
}

/// GET /{subject_id}/active
#[instrument(skip(state))]
async fn active_quests(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<QuestLogEntry>>>, ApiError> {
    Ok(ok(state.runtime.active_quests(subject_id).await?))
}

/// GET /{subject_id}/available
#[instrument(skip(state))]
async fn available_quests(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<AvailableQuestView>>>, ApiError> {
    Ok(ok(state.runtime.available_quests(subject_id).await?))
}

/// Returns the router for the quests context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accept", post(accept_quest))
        .route("/abandon", post(abandon_quest))
        .route("/{subject_id}", get(quest_log))
        .route("/{subject_id}/active", get(active_quests))
        .route("/{subject_id}/available", get(available_quests))
}
