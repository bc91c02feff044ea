//! Subscribable notifications for faults and advisories.
//!
//! The engine never aborts the process on a bad stream. Instead, each
//! top-level call publishes what went wrong here, once, and returns. Batch
//! decode loops subscribe to learn why they stopped.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use vc_utils::hash::ConcurrentMap;

use crate::SerialError;

// -----------------------------------------------------------------------------
// SerialEvent

/// Direction of the pass that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Write,
    Read,
}

/// A notification published through an [`EventHub`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SerialEvent {
    /// A top-level call failed.
    Fault {
        direction: Direction,
        error: SerialError,
    },
    /// The extension factory could not supply a handler.
    ExtensionFailed {
        type_name: String,
        cause: SerialError,
    },
    /// A generic instantiation reached dynamic dispatch without being
    /// registered or provably shareable. Advisory.
    AotUnsafe { type_name: String },
}

// -----------------------------------------------------------------------------
// EventHub

/// Identifier returned by [`EventHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SerialEvent) + Send + Sync>;

/// A thread-safe list of event listeners.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use vc_serial::events::{EventHub, SerialEvent};
///
/// let hub = EventHub::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let id = hub.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
///
/// hub.publish(SerialEvent::AotUnsafe { type_name: "demo::Pair<i32, i32>".into() });
/// assert_eq!(seen.lock().unwrap().len(), 1);
///
/// assert!(hub.unsubscribe(id));
/// ```
pub struct EventHub {
    next_id: AtomicU64,
    listeners: ConcurrentMap<u64, Listener>,
}

impl EventHub {
    /// Creates a hub without listeners.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: ConcurrentMap::default(),
        }
    }

    /// Registers a listener, called for every event published afterwards.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SerialEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    /// Returns the number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers `event` to every listener.
    pub fn publish(&self, event: SerialEvent) {
        // Snapshot first: a listener may subscribe or unsubscribe.
        let listeners: Vec<Listener> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for EventHub {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::{Direction, EventHub, SerialEvent};
    use crate::SerialError;

    #[test]
    fn publish_reaches_every_listener() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            hub.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        hub.publish(SerialEvent::Fault {
            direction: Direction::Read,
            error: SerialError::IncompleteInput {
                needed: 4,
                available: 0,
            },
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let hub = Arc::new(EventHub::new());
        let slot = Arc::new(std::sync::Mutex::new(None));

        let inner_hub = Arc::clone(&hub);
        let inner_slot = Arc::clone(&slot);
        let id = hub.subscribe(move |_| {
            if let Some(id) = inner_slot.lock().unwrap().take() {
                inner_hub.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        hub.publish(SerialEvent::AotUnsafe {
            type_name: "x".into(),
        });
        assert_eq!(hub.listener_count(), 0);
    }
}
