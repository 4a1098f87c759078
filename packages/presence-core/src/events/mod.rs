//! Event system for account lifecycle notifications.
//!
//! This module provides:
//! - [`MonitorEvent`], the typed lifecycle event emitted by an account monitor
//! - [`ListenerRegistry`] mapping event kinds to ordered callback lists
//! - [`EventEmitter`] trait for consumers that want the whole event stream
//! - [`BroadcastEventBridge`] for async consumers on a tokio broadcast channel

mod bridge;
mod emitter;
mod registry;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use registry::{Listener, ListenerHandle, ListenerRegistry};

use serde::Serialize;

use crate::activity::ActivitySnapshot;
use crate::error::PollFailure;

/// Discriminant of [`MonitorEvent`], used as the listener registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Connecting,
    Connected,
    Disconnected,
    Error,
    Update,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Connecting,
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Error,
        EventKind::Update,
    ];
}

/// Lifecycle events emitted by an account monitor.
///
/// Every variant carries the account identifier so a single listener can be
/// shared between monitors, and payloads are complete enough that consumers
/// never need to query the monitor or the network again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MonitorEvent {
    /// `start` was called; verification is in progress.
    Connecting {
        /// The monitored account's identifier.
        #[serde(rename = "accountId")]
        account_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Verification (or a recovery poll) succeeded.
    Connected {
        /// The monitored account's identifier.
        #[serde(rename = "accountId")]
        account_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// `stop` was called. Cached snapshots must be discarded.
    Disconnected {
        /// The monitored account's identifier.
        #[serde(rename = "accountId")]
        account_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A poll failed. Repeats refresh the timestamp; they are not new problems.
    Error {
        /// The monitored account's identifier.
        #[serde(rename = "accountId")]
        account_id: String,
        /// Classification and reason.
        failure: PollFailure,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A new, different activity snapshot is available.
    Update {
        /// The monitored account's identifier.
        #[serde(rename = "accountId")]
        account_id: String,
        /// The full replacement snapshot.
        snapshot: ActivitySnapshot,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl MonitorEvent {
    /// Returns the discriminant of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connecting { .. } => EventKind::Connecting,
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Error { .. } => EventKind::Error,
            Self::Update { .. } => EventKind::Update,
        }
    }

    /// Returns the identifier of the account the event belongs to.
    #[must_use]
    pub fn account_id(&self) -> &str {
        match self {
            Self::Connecting { account_id, .. }
            | Self::Connected { account_id, .. }
            | Self::Disconnected { account_id, .. }
            | Self::Error { account_id, .. }
            | Self::Update { account_id, .. } => account_id,
        }
    }

    /// Returns the event timestamp in Unix milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Connecting { timestamp, .. }
            | Self::Connected { timestamp, .. }
            | Self::Disconnected { timestamp, .. }
            | Self::Error { timestamp, .. }
            | Self::Update { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn error_event_serializes_with_kind_tag() {
        let event = MonitorEvent::Error {
            account_id: "acct-1".into(),
            failure: PollFailure {
                kind: FailureKind::AuthenticationFailure,
                reason: "HTTP 401".into(),
            },
            timestamp: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["accountId"], "acct-1");
        assert_eq!(json["failure"]["kind"], "authenticationFailure");
        assert_eq!(event.kind(), EventKind::Error);
        assert_eq!(event.timestamp(), 42);
    }

    #[test]
    fn kind_matches_variant() {
        let event = MonitorEvent::Disconnected {
            account_id: "acct-1".into(),
            timestamp: 0,
        };
        assert_eq!(event.kind(), EventKind::Disconnected);
        assert_eq!(event.account_id(), "acct-1");
    }
}
