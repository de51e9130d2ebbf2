//! Shared application state.

use std::sync::Arc;

use crate::runtime::NarrativeRuntime;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The wired narrative engine.
    pub runtime: Arc<NarrativeRuntime>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(runtime: NarrativeRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
