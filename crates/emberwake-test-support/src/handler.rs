//! Event bus subscribers for asserting on published events.

use std::sync::Mutex;

use async_trait::async_trait;
use emberwake_core::event::{EventName, WorldEvent};
use emberwake_event_bus::{EventBus, EventHandler, HandlerError};

/// Records every event it receives, in delivery order.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    received: Mutex<Vec<WorldEvent>>,
}

impl RecordingHandler {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<WorldEvent> {
        self.received.lock().unwrap().clone()
    }

    /// Names of every event received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn names(&self) -> Vec<EventName> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(WorldEvent::name)
            .collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &WorldEvent, _bus: &EventBus) -> Result<(), HandlerError> {
        self.received.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Fails on every event with `HandlerError::Failed`.
#[derive(Debug, Default)]
pub struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    async fn handle(&self, event: &WorldEvent, _bus: &EventBus) -> Result<(), HandlerError> {
        Err(HandlerError::Failed(format!("refused {}", event.name())))
    }
}
