//! Named publish/subscribe hub decoupling the session core from adapters.
//!
//! Callbacks for one topic fire synchronously, in registration order, on the
//! publishing thread. Payloads are opaque JSON values forwarded verbatim.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::warn;

type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle identifying a single registration.
///
/// Pass it back to [`EventBus::unsubscribe`] to remove the callback.
/// Unsubscribing twice, or with a handle the bus no longer knows, is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    topic: String,
    id: u64,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, EventCallback)>>,
}

/// Synchronous event bus.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Callbacks never run under this lock, so poisoning can only come
        // from a panic between lock and unlock here; recover the data.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a callback for a topic; never fails.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .handlers
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription { topic, id }
    }

    /// Publishes a payload to every callback registered for the topic.
    ///
    /// Callbacks run in registration order on the calling thread. A panic in
    /// one callback is isolated: it is logged and the remaining callbacks
    /// still run. Publishing to a topic with no subscribers is a no-op.
    pub fn publish(&self, topic: &str, payload: &Value) {
        // Snapshot outside the lock so callbacks may subscribe/unsubscribe
        // (or publish) without deadlocking. Registrations made by a callback
        // take effect from the next publish.
        let callbacks: Vec<EventCallback> = match self.registry().handlers.get(topic) {
            Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };
        for callback in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                warn!(topic, "event callback panicked; continuing with remaining callbacks");
            }
        }
    }

    /// Removes a registration; idempotent.
    pub fn unsubscribe(&self, handle: &Subscription) {
        let mut registry = self.registry();
        if let Some(entries) = registry.handlers.get_mut(&handle.topic) {
            entries.retain(|(id, _)| *id != handle.id);
            if entries.is_empty() {
                registry.handlers.remove(&handle.topic);
            }
        }
    }
}
