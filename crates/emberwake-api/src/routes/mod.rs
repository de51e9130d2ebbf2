//! Route modules organized by bounded context.

use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub mod characters;
pub mod dialogue;
pub mod events;
pub mod flags;
pub mod health;
pub mod quests;

/// Success body wrapping a handler's result.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always `true`.
    pub success: bool,
    /// The result.
    pub data: T,
}

/// Wraps `data` in a success body.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

/// The full route tree, without middleware or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/characters", characters::router())
        .nest("/api/v1/dialogue", dialogue::router())
        .nest("/api/v1/quests", quests::router())
        .nest("/api/v1/flags", flags::router())
        .nest("/api/v1/events", events::router())
}
