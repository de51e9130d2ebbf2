//! The event bus.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use emberwake_core::event::{EventName, WorldEvent};

use crate::handler::{EventHandler, FnHandler, HandlerError};

/// Token returned by `subscribe`, used to remove that one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    name: EventName,
    id: u64,
}

impl Subscription {
    /// The event name the handler was registered for.
    #[must_use]
    pub fn event_name(&self) -> EventName {
        self.name
    }
}

type Registered = (u64, Arc<dyn EventHandler>);

/// Synchronous publish/subscribe dispatcher.
///
/// Constructed once at startup and shared by reference (or `Arc`).
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventName, Vec<Registered>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_counts())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `name`. Handlers run in registration order.
    pub fn subscribe(&self, name: EventName, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .push((id, handler));
        debug!(event = %name, subscription = id, "handler subscribed");
        Subscription { name, id }
    }

    /// Registers a synchronous closure for `name`.
    pub fn subscribe_fn<F>(&self, name: EventName, handler: F) -> Subscription
    where
        F: Fn(&WorldEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe(name, Arc::new(FnHandler(handler)))
    }

    /// Removes one handler. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = handlers.get_mut(&subscription.name) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(id, _)| *id != subscription.id);
        before != registered.len()
    }

    /// Removes every handler for `name`. Returns how many were removed.
    pub fn unsubscribe_all(&self, name: EventName) -> usize {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name)
            .map_or(0, |registered| registered.len())
    }

    /// Number of handlers per event name, omitting names with none.
    #[must_use]
    pub fn subscriber_counts(&self) -> BTreeMap<EventName, usize> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, registered)| !registered.is_empty())
            .map(|(name, registered)| (*name, registered.len()))
            .collect()
    }

    /// Delivers `event` to every handler registered for its name, awaiting
    /// each in turn. Returns once all of them, and every cascade they
    /// started, have finished.
    ///
    /// Handler failures are logged and skipped. Handlers added or removed
    /// while this call runs take effect from the next publish.
    pub async fn publish(&self, event: &WorldEvent) {
        let name = event.name();
        let handlers = self.snapshot(name);
        debug!(
            event = %name,
            event_id = %event.metadata.event_id,
            subject_id = %event.subject_id(),
            handlers = handlers.len(),
            "publishing event"
        );

        for (id, handler) in handlers {
            if let Err(err) = handler.handle(event, self).await {
                warn!(
                    event = %name,
                    event_id = %event.metadata.event_id,
                    subscription = id,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }

    fn snapshot(&self, name: EventName) -> Vec<Registered> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use emberwake_core::clock::SystemClock;
    use emberwake_core::event::{LocationVisited, NpcTalked, WorldEventKind};
    use uuid::Uuid;

    use super::*;

    fn npc_talked(subject_id: Uuid) -> WorldEvent {
        WorldEvent::new(
            WorldEventKind::NpcTalked(NpcTalked {
                subject_id,
                npc_id: "npc_ana".into(),
            }),
            Uuid::new_v4(),
            &SystemClock,
        )
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &str,
    ) -> impl Fn(&WorldEvent) -> Result<(), HandlerError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        let label = label.to_owned();
        move |event: &WorldEvent| {
            log.lock().unwrap().push(format!("{label}:{}", event.name()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();

        bus.publish(&npc_talked(Uuid::new_v4())).await;

        assert!(bus.subscriber_counts().is_empty());
    }

    #[tokio::test]
    async fn test_handlers_run_in_subscription_order() {
        // Arrange
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "first"));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "second"));
        bus.subscribe_fn(EventName::EnemyKilled, recorder(&log, "other"));

        // Act
        bus.publish(&npc_talked(Uuid::new_v4())).await;

        // Assert
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:npc.talked", "second:npc.talked"]
        );
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_later_handlers() {
        // Arrange
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_fn(EventName::NpcTalked, |_: &WorldEvent| {
            Err(HandlerError::Failed("boom".into()))
        });
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "after"));

        // Act
        bus.publish(&npc_talked(Uuid::new_v4())).await;

        // Assert
        assert_eq!(*log.lock().unwrap(), vec!["after:npc.talked"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_handler() {
        // Arrange
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "first"));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "second"));

        // Act
        let removed = bus.unsubscribe(first);
        let removed_again = bus.unsubscribe(first);
        bus.publish(&npc_talked(Uuid::new_v4())).await;

        // Assert
        assert!(removed);
        assert!(!removed_again);
        assert_eq!(first.event_name(), EventName::NpcTalked);
        assert_eq!(*log.lock().unwrap(), vec!["second:npc.talked"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_clears_one_event_name() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "a"));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "b"));
        bus.subscribe_fn(EventName::EnemyKilled, recorder(&log, "c"));

        assert_eq!(bus.unsubscribe_all(EventName::NpcTalked), 2);
        assert_eq!(bus.unsubscribe_all(EventName::NpcTalked), 0);
        bus.publish(&npc_talked(Uuid::new_v4())).await;

        assert!(log.lock().unwrap().is_empty());
        let counts = bus.subscriber_counts();
        assert_eq!(counts.get(&EventName::EnemyKilled), Some(&1));
        assert_eq!(counts.get(&EventName::NpcTalked), None);
    }

    struct Relay;

    #[async_trait]
    impl EventHandler for Relay {
        async fn handle(&self, event: &WorldEvent, bus: &EventBus) -> Result<(), HandlerError> {
            let follow_up = WorldEvent::caused_by(
                event,
                WorldEventKind::LocationVisited(LocationVisited {
                    subject_id: event.subject_id(),
                    location_id: "harbor".into(),
                }),
                &SystemClock,
            );
            bus.publish(&follow_up).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cascade_completes_before_publish_returns() {
        // Arrange
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventName::NpcTalked, Arc::new(Relay));
        bus.subscribe_fn(EventName::NpcTalked, recorder(&log, "outer"));
        bus.subscribe_fn(EventName::LocationVisited, recorder(&log, "inner"));

        // Act
        bus.publish(&npc_talked(Uuid::new_v4())).await;

        // Assert
        assert_eq!(
            *log.lock().unwrap(),
            vec!["inner:location.visited", "outer:npc.talked"]
        );
    }
}
