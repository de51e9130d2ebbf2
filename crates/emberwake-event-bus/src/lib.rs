//! Emberwake Event Bus: in-process publish/subscribe.
//!
//! Handlers registered for an event name run one after another, in
//! subscription order, inside the publisher's `publish` call. A handler
//! failure is logged and never reaches the publisher. Nothing is persisted
//! or replayed.

pub mod bus;
pub mod handler;

pub use bus::{EventBus, Subscription};
pub use handler::{EventHandler, HandlerError};
