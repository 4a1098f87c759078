//! Listener registry: event kind to ordered callback list.
//!
//! Invocation never happens under the registry lock. Callers take a
//! [`ListenerRegistry::snapshot`] and invoke from it, so a callback may freely
//! subscribe or unsubscribe (itself or others) during delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{EventKind, MonitorEvent};

/// A registered callback.
pub type Listener = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

/// Handle returned by [`ListenerRegistry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: u64,
    kind: EventKind,
}

/// Maps each [`EventKind`] to its callbacks in insertion order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<EventKind, Vec<(u64, Listener)>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback to the list for `kind`.
    ///
    /// The same callback may be registered under several kinds; each
    /// registration gets its own handle.
    pub fn subscribe(&self, kind: EventKind, listener: Listener) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push((id, listener));
        ListenerHandle { id, kind }
    }

    /// Removes a registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(&handle.kind) else {
            return false;
        };
        let len_before = list.len();
        list.retain(|(id, _)| *id != handle.id);
        list.len() < len_before
    }

    /// Returns true if the registration is still present.
    #[must_use]
    pub fn is_registered(&self, handle: ListenerHandle) -> bool {
        self.listeners
            .read()
            .get(&handle.kind)
            .is_some_and(|list| list.iter().any(|(id, _)| *id == handle.id))
    }

    /// Copies the current callbacks for `kind`, in invocation order.
    #[must_use]
    pub fn snapshot(&self, kind: EventKind) -> Vec<(ListenerHandle, Listener)> {
        self.listeners
            .read()
            .get(&kind)
            .map(|list| {
                list.iter()
                    .map(|(id, l)| (ListenerHandle { id: *id, kind }, Arc::clone(l)))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }
}
