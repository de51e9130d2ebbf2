//! Routes for the Dialogue context.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use emberwake_dialogue::application::command_handlers::TalkOutcome;

use crate::error::ApiError;
use crate::routes::{Envelope, ok};
use crate::runtime::ChoiceResult;
use crate::state::AppState;

/// Request body for POST /talk.
#[derive(Debug, Deserialize)]
pub struct TalkRequest {
    /// The subject talking.
    pub subject_id: Uuid,
    /// The npc talked to.
    pub npc_id: String,
}

/// Request body for POST /choose.
#[derive(Debug, Deserialize)]
pub struct ChooseOptionRequest {
    /// The subject choosing.
    pub subject_id: Uuid,
    /// The npc spoken to.
    pub npc_id: String,
    /// The node answered; the npc's current node when absent.
    #[serde(default)]
    pub dialogue_id: Option<String>,
    /// Position among the visible options.
    pub option_index: usize,
}

/// POST /talk
#[instrument(skip(state, request), fields(subject_id = %request.subject_id, npc_id = %request.npc_id))]
async fn talk(
    State(state): State<AppState>,
    Json(request): Json<TalkRequest>,
) -> Result<Json<Envelope<TalkOutcome>>, ApiError> {
    Ok(ok(state
        .runtime
        .talk(request.subject_id, &request.npc_id)
        .await?))
}

/// POST /choose
#[instrument(
    skip(state, request),
    fields(subject_id = %request.subject_id, npc_id = %request.npc_id, option_index = request.option_index)
)]
async fn choose_option(
    State(state): State<AppState>,
    Json(request): Json<ChooseOptionRequest>,
) -> Result<Json<Envelope<ChoiceResult>>, ApiError> {
    Ok(ok(state
        .runtime
        .choose_option(
            request.subject_id,
            &request.npc_id,
            request.dialogue_id,
            request.option_index,
        )
        .await?))
}

/// Returns the router for the dialogue context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/talk", post(talk))
        .route("/choose", post(choose_option))
}
