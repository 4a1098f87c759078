//! Bridge from synchronous monitor delivery to async consumers.
//!
//! The [`BroadcastEventBridge`] is attached to one or more monitors as an
//! [`EventEmitter`] and republishes every event on a `tokio::sync::broadcast`
//! channel, so async tasks can consume events without running inside the
//! monitor's delivery path.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::emitter::EventEmitter;
use super::MonitorEvent;

/// Bridges monitor events to a broadcast channel.
///
/// Also forwards to an optional external emitter that can be set after
/// construction (for example a logging emitter enabled at runtime).
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and cheap to clone; clones share the channel.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<MonitorEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (a `broadcast::channel` requirement).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that sees every event before the channel.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Returns the channel as a `Stream`. Lagged receivers yield an error item.
    pub fn stream(&self) -> BroadcastStream<MonitorEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }
}

impl EventEmitter for BroadcastEventBridge {
    fn emit(&self, event: &MonitorEvent) {
        if let Some(ref emitter) = *self.external_emitter.read() {
            emitter.emit(event);
        }
        if let Err(e) = self.tx.send(event.clone()) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl EventEmitter for Counter {
        fn emit(&self, _event: &MonitorEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn connected() -> MonitorEvent {
        MonitorEvent::Connected {
            account_id: "acct".into(),
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn forwards_to_receivers_and_external_emitter() {
        let bridge = BroadcastEventBridge::new(8);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bridge.set_external_emitter(counter.clone());
        let mut rx = bridge.subscribe();
        let mut stream = bridge.stream();

        bridge.emit(&connected());

        assert_eq!(rx.recv().await.unwrap().kind(), EventKind::Connected);
        let item = stream.next().await.unwrap().unwrap();
        assert_eq!(item.account_id(), "acct");
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_without_receivers_does_not_panic() {
        let bridge = BroadcastEventBridge::new(1);
        bridge.emit(&connected());
    }
}
