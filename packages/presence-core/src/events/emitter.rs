//! Event emitter abstraction for whole-stream consumers.
//!
//! Per-kind callbacks go through the listener registry. Consumers that want
//! every event (logging, transport bridges) implement [`EventEmitter`] and are
//! attached to a monitor with `AccountMonitor::attach`.

use super::MonitorEvent;

/// Trait for consuming monitor events without knowledge of their source.
///
/// Called synchronously on the monitor's delivery path, so implementations
/// must not block.
///
/// # Example
///
/// ```ignore
/// let handles = monitor.attach(Arc::new(LoggingEventEmitter));
/// ```
pub trait EventEmitter: Send + Sync {
    /// Consumes one event.
    fn emit(&self, event: &MonitorEvent);
}

/// No-op emitter for tests and embedders that only use per-kind listeners.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: &MonitorEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: &MonitorEvent) {
        tracing::debug!(?event, account = event.account_id(), "monitor_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events per kind.
    struct CountingEventEmitter {
        connected: AtomicUsize,
        other: AtomicUsize,
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit(&self, event: &MonitorEvent) {
            if event.kind() == EventKind::Connected {
                self.connected.fetch_add(1, Ordering::SeqCst);
            } else {
                self.other.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter {
            connected: AtomicUsize::new(0),
            other: AtomicUsize::new(0),
        });

        emitter.emit(&MonitorEvent::Connected {
            account_id: "a".into(),
            timestamp: 0,
        });
        emitter.emit(&MonitorEvent::Disconnected {
            account_id: "a".into(),
            timestamp: 0,
        });
        LoggingEventEmitter.emit(&MonitorEvent::Connecting {
            account_id: "a".into(),
            timestamp: 0,
        });

        assert_eq!(emitter.connected.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.other.load(Ordering::SeqCst), 1);
    }
}
