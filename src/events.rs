//! Callback registration for change notifications.
//!
//! Observers subscribe a closure and get a [`SubscriptionId`] back that can be
//! used to unsubscribe. Emission is synchronous: every listener runs on the
//! emitting thread before `emit` returns. The listener list is snapshotted
//! before dispatch, so listeners may subscribe or unsubscribe re-entrantly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Thread-safe list of listeners for events of type `E`.
pub struct EventListeners<E> {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register `listener`; it is called for every subsequent event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener with `event`, in subscription order.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl<E> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.len())
            .finish()
    }
}
