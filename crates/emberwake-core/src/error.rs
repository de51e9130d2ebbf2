//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An npc, dialogue node, quest or record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency conflict on a versioned record.
    #[error("concurrency conflict on record {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The record key that had the conflict.
        key: String,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Short, user-facing message without the error class prefix.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{what} not found"),
            Self::ConcurrencyConflict { .. } => "state changed concurrently, try again".to_owned(),
            Self::Validation(message) => message.clone(),
            Self::Infrastructure(_) => "storage unavailable".to_owned(),
        }
    }
}
