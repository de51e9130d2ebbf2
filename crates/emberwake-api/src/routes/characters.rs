//! Routes for character sheets.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::{Envelope, ok};
use crate::runtime::CharacterView;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    /// The subject the character belongs to.
    pub subject_id: Uuid,
    /// Display name.
    pub name: String,
}

/// POST /
#[instrument(skip(state, request), fields(subject_id = %request.subject_id))]
async fn create_character(
    State(state): State<AppState>,
    Json(request): Json<CreateCharacterRequest>,
) -> Result<(StatusCode, Json<Envelope<CharacterView>>), ApiError> {
    let character = state
        .runtime
        .create_character(request.subject_id, &request.name)
        .await?;
    info!(level = character.sheet.level, "character created");
    Ok((StatusCode::CREATED, ok(character)))
}

/// GET /{subject_id}
#[instrument(skip(state))]
async fn get_character(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Envelope<CharacterView>>, ApiError> {
    Ok(ok(state.runtime.character(subject_id).await?))
}

/// Returns the router for character sheets.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_character))
        .route("/{subject_id}", get(get_character))
}
