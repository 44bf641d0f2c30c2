//! Pub/Sub event bus publishing content service state changes.
//!
//! Architecture:
//! - Observers subscribe to an event type with a callback
//! - emit() invokes callbacks immediately AND queues the event
//! - poll() drains queued events for batch processing in the owner's loop
//!
//! Callback order: FIFO within one event type. Cross-type order is undefined.
//! The service never calls into observers other than through this bus.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use log::warn;
use uuid::Uuid;

use crate::core::service::PlaybackState;
use crate::error::ContentError;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Blanket-implemented for every qualifying type.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

/// Identifies one subscription, for `unsubscribe()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

// ========== Service events ==========

/// Catalog replaced after a successful load
#[derive(Debug, Clone)]
pub struct ScenesLoaded {
    pub count: usize,
}

/// Playback state or current scene changed
#[derive(Debug, Clone)]
pub struct SceneTransition {
    pub previous: Option<Uuid>,
    pub current: Option<Uuid>,
    pub state: PlaybackState,
}

/// An operation failed; the error is also kept by the service
#[derive(Debug, Clone)]
pub struct ContentErrorRaised {
    pub error: ContentError,
}

/// Pub/Sub event bus. Cheap to clone; clones share subscribers and queue.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<TypeId, Vec<(SubscriberId, Callback)>>>>,
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_types", &self.subscribers.read().map(|s| s.len()).unwrap_or(0))
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type E. Callback runs synchronously inside emit().
    pub fn subscribe<E, F>(&self, callback: F) -> SubscriberId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, wrapped));
        id
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let mut found = false;
        for callbacks in subs.values_mut() {
            let before = callbacks.len();
            callbacks.retain(|(sid, _)| *sid != id);
            found |= callbacks.len() != before;
        }
        found
    }

    /// Invoke callbacks for E, then queue the event for poll().
    pub fn emit<E: Event>(&self, event: E) {
        // Clone callbacks out so a callback may subscribe without deadlocking
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .map(|cbs| cbs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for cb in callbacks {
            cb(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(Box::new(event));
    }

    /// Drain all queued events
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .is_some_and(|v| !v.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

/// Downcast a queued event to its concrete type.
///
/// Must deref to `dyn Event` first: calling `as_any()` on the Box itself
/// hits the blanket impl for `Box<dyn Event>` and the downcast always fails.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&total);

        bus.subscribe::<ScenesLoaded, _>(move |e| {
            t.fetch_add(e.count, Ordering::SeqCst);
        });

        bus.emit(ScenesLoaded { count: 6 });
        assert_eq!(total.load(Ordering::SeqCst), 6);
        bus.emit(ScenesLoaded { count: 2 });
        assert_eq!(total.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(ScenesLoaded { count: 1 });
        bus.emit(SceneTransition {
            previous: None,
            current: Some(Uuid::new_v4()),
            state: PlaybackState::Playing,
        });

        let events = bus.poll();
        assert_eq!(events.len(), 2);
        assert_eq!(downcast_event::<ScenesLoaded>(&events[0]).map(|e| e.count), Some(1));
        assert!(downcast_event::<ScenesLoaded>(&events[1]).is_none());
        assert!(bus.poll().is_empty());
    }

    #[test]
    fn test_unsubscribe_only_removes_one() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = Arc::clone(&hits);
        let first = bus.subscribe::<ScenesLoaded, _>(move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = Arc::clone(&hits);
        bus.subscribe::<ScenesLoaded, _>(move |_| {
            h2.fetch_add(10, Ordering::SeqCst);
        });

        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));

        bus.emit(ScenesLoaded { count: 0 });
        assert_eq!(hits.load(Ordering::SeqCst), 10);
        assert!(bus.has_subscribers::<ScenesLoaded>());
    }

    #[test]
    fn test_queue_overflow_drops_oldest() {
        let bus = EventBus::new();
        for i in 0..(MAX_QUEUE_SIZE + 1) {
            bus.emit(ScenesLoaded { count: i });
        }
        let events = bus.poll();
        assert_eq!(events.len(), MAX_QUEUE_SIZE / 2 + 1);
        assert_eq!(downcast_event::<ScenesLoaded>(&events[0]).map(|e| e.count), Some(MAX_QUEUE_SIZE / 2));
    }
}
