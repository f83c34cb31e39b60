//! Cache Event Module
//!
//! Synchronous, ordered, multi-subscriber notification stream for cache
//! activity. The cache emits events; it never logs or persists them.
//! Observability collaborators subscribe and decide what to do.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

// == Reject Reason ==
/// Reason attached to a `Reject` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A single value larger than the store's entire byte budget.
    SizeExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::SizeExceeded => write!(f, "size_exceeded"),
        }
    }
}

// == Cache Event ==
/// Notification emitted by a cache store or its memory monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A lookup found a live entry.
    Hit { key: String },
    /// A lookup found nothing.
    Miss { key: String },
    /// A lookup or sweep found an entry past its TTL and removed it.
    /// Distinct from `Miss` so observers can tell absence from decay.
    Expired { key: String },
    /// An entry was inserted or overwritten.
    Set { key: String, size: u64 },
    /// An entry was removed by an explicit delete.
    Delete { key: String },
    /// An entry was removed to satisfy a capacity or pressure constraint.
    Evict { key: String, size: u64 },
    /// The store was emptied in bulk.
    Clear { entries_removed: usize },
    /// A `set` was refused without mutating the store.
    Reject { key: String, reason: RejectReason },
    /// Host memory usage crossed the monitor's threshold.
    MemoryPressure { ratio: f64 },
}

// == Subscriber Id ==
/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type SubscriberFn = Box<dyn Fn(&CacheEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriberId, SubscriberFn)>,
}

// == Event Bus ==
/// Explicit observer registry for cache events.
///
/// Cloning an `EventBus` yields another handle onto the same registry.
/// Delivery is synchronous and in registration order. Callbacks run while
/// the registry is borrowed and must not subscribe or unsubscribe from
/// within a callback.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    // == Constructor ==
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Registers a callback and returns its id.
    pub fn subscribe(&self, callback: impl Fn(&CacheEvent) + Send + Sync + 'static) -> SubscriberId {
        let mut registry = self.inner.lock();
        registry.next_id += 1;
        let id = SubscriberId(registry.next_id);
        registry.subscribers.push((id, Box::new(callback)));
        id
    }

    // == Unsubscribe ==
    /// Removes a subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = self.inner.lock();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(sub_id, _)| *sub_id != id);
        registry.subscribers.len() != before
    }

    // == Publish ==
    /// Delivers an event to every subscriber, in registration order.
    pub fn publish(&self, event: &CacheEvent) {
        let registry = self.inner.lock();
        for (_, callback) in &registry.subscribers {
            callback(event);
        }
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn collector(bus: &EventBus) -> Arc<Mutex<Vec<CacheEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |event| sink.lock().push(event.clone()));
        seen
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let bus = EventBus::new();
        let seen = collector(&bus);

        bus.publish(&CacheEvent::Miss {
            key: "k".to_string(),
        });

        assert_eq!(
            *seen.lock(),
            vec![CacheEvent::Miss {
                key: "k".to_string()
            }]
        );
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(move |_| order.lock().push(tag));
        }

        bus.publish(&CacheEvent::Clear { entries_removed: 0 });

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0u32));
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(move |_| *sink.lock() += 1);

        bus.publish(&CacheEvent::Clear { entries_removed: 0 });
        assert!(bus.unsubscribe(id));
        bus.publish(&CacheEvent::Clear { entries_removed: 0 });

        assert_eq!(*seen.lock(), 1);
        // Second unsubscribe finds nothing.
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_cloned_handle_shares_registry() {
        let bus = EventBus::new();
        let handle = bus.clone();
        let seen = collector(&handle);

        bus.publish(&CacheEvent::Delete {
            key: "x".to_string(),
        });

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::SizeExceeded.to_string(), "size_exceeded");
    }
}
