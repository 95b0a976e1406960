//! Subscription registry - callbacks keyed by event type

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

use super::types::StreamEvent;

/// Registry key that receives every event regardless of type
pub const WILDCARD: &str = "*";

/// Callback invoked for each dispatched event
pub type Callback = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

/// Identifier of a single registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_type: HashMap<String, Vec<(SubscriptionId, Callback)>>,
}

/// Cloneable handle to the shared subscription registry
///
/// Every clone registers into the same registry, so a handle can be given to
/// other tasks while the owning feed keeps dispatching.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<Registry>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `event_type` (or [`WILDCARD`])
    pub fn subscribe<F>(&self, event_type: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .by_type
            .entry(event_type.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        debug!(%event_type, ?id, "Subscribers::subscribe: registered");

        Subscription {
            id,
            event_type,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Callbacks to run for an event of `event_type`: typed ones, then wildcard ones
    pub(crate) fn callbacks_for(&self, event_type: &str) -> Vec<Callback> {
        let registry = self.lock();
        let typed = registry.by_type.get(event_type).into_iter().flatten();
        let wildcard = if event_type == WILDCARD {
            None
        } else {
            registry.by_type.get(WILDCARD)
        };
        typed
            .chain(wildcard.into_iter().flatten())
            .map(|(_, cb)| Arc::clone(cb))
            .collect()
    }

    /// Number of callbacks registered under exactly `event_type`
    pub fn count(&self, event_type: &str) -> usize {
        self.lock().by_type.get(event_type).map_or(0, Vec::len)
    }

    /// Number of distinct event types with at least one callback
    pub fn type_count(&self) -> usize {
        self.lock().by_type.len()
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.lock().by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.inner)
    }
}

// A callback that panicked poisons nothing we rely on; keep using the map.
fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Capability to remove one registration
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "dropping a Subscription keeps the callback registered"]
pub struct Subscription {
    id: SubscriptionId,
    event_type: String,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove exactly this registration, pruning the type entry if it empties
    ///
    /// Returns false if the registry is gone or the entry was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            debug!(event_type = %self.event_type, "Subscription::unsubscribe: registry dropped");
            return false;
        };
        let mut registry = lock_registry(&registry);

        let Some(callbacks) = registry.by_type.get_mut(&self.event_type) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != self.id);
        let removed = callbacks.len() != before;

        if callbacks.is_empty() {
            debug!(event_type = %self.event_type, "Subscription::unsubscribe: pruning empty type");
            registry.by_type.remove(&self.event_type);
        }
        debug!(event_type = %self.event_type, id = ?self.id, removed, "Subscription::unsubscribe");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventId;

    #[test]
    fn test_subscribe_counts() {
        let subs = Subscribers::new();
        let _a = subs.subscribe("status", |_| {});
        let _b = subs.subscribe("status", |_| {});
        let _c = subs.subscribe(WILDCARD, |_| {});

        assert_eq!(subs.count("status"), 2);
        assert_eq!(subs.count(WILDCARD), 1);
        assert_eq!(subs.type_count(), 2);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn test_unsubscribe_is_precise() {
        let subs = Subscribers::new();
        let a = subs.subscribe("step", |_| {});
        let _b = subs.subscribe("step", |_| {});

        assert!(a.unsubscribe());
        assert_eq!(subs.count("step"), 1);
    }

    #[test]
    fn test_unsubscribe_prunes_empty_type() {
        let subs = Subscribers::new();
        let a = subs.subscribe("result", |_| {});
        assert_eq!(subs.type_count(), 1);

        assert!(a.unsubscribe());
        assert_eq!(subs.type_count(), 0);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let subs = Subscribers::new();
        let a = subs.subscribe("status", |_| {});
        drop(subs);
        assert!(!a.unsubscribe());
    }

    #[test]
    fn test_callbacks_typed_before_wildcard() {
        let subs = Subscribers::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        let _w = subs.subscribe(WILDCARD, move |_| o.lock().unwrap().push("wildcard"));
        let o = Arc::clone(&order);
        let _t = subs.subscribe("status", move |_| o.lock().unwrap().push("status"));

        let event = StreamEvent::new(EventId(1), "status", serde_json::Value::Null);
        for cb in subs.callbacks_for("status") {
            cb(&event);
        }

        assert_eq!(*order.lock().unwrap(), vec!["status", "wildcard"]);
    }

    #[test]
    fn test_wildcard_typed_event_not_doubled() {
        let subs = Subscribers::new();
        let _w = subs.subscribe(WILDCARD, |_| {});
        assert_eq!(subs.callbacks_for(WILDCARD).len(), 1);
    }
}
