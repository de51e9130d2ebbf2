//! Subscriber contract.

use async_trait::async_trait;
use thiserror::Error;

use emberwake_core::error::DomainError;
use emberwake_core::event::WorldEvent;

use crate::bus::EventBus;

/// Failure raised by a subscriber. Logged by the bus, never propagated.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler hit a domain or storage error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

/// A subscriber to one or more event names.
///
/// The bus passes itself in so a handler can publish follow-up events
/// without holding a reference back to the bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Reacts to a published event.
    async fn handle(&self, event: &WorldEvent, bus: &EventBus) -> Result<(), HandlerError>;
}

/// Adapter for plain synchronous closures.
pub(crate) struct FnHandler<F>(pub(crate) F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&WorldEvent) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, event: &WorldEvent, _bus: &EventBus) -> Result<(), HandlerError> {
        (self.0)(event)
    }
}
