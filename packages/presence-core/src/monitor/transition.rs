//! Pure lifecycle transitions.
//!
//! [`step`] maps the current state, the cached snapshot and one poll outcome
//! to the next state and the notifications it produces. It has no side
//! effects; the monitor applies the result under its state lock.

use std::fmt;

use serde::Serialize;

use crate::activity::ActivitySnapshot;
use crate::error::PollFailure;

/// Connection phase of an account monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    /// Not started, or stopped.
    #[default]
    Disconnected,
    /// Started; the credential has not been verified yet.
    Connecting,
    /// The last poll succeeded.
    Connected,
    /// The last poll failed. Retries continue automatically.
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A notification produced by a transition, before it becomes an event.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Notification {
    Connected,
    Update(ActivitySnapshot),
    Error(PollFailure),
}

/// Result of applying one poll outcome.
#[derive(Debug, PartialEq)]
pub(crate) struct Step {
    pub state: LifecycleState,
    pub snapshot: Option<ActivitySnapshot>,
    pub failure: Option<PollFailure>,
    pub notifications: Vec<Notification>,
}

/// Computes the transition for a completed poll.
///
/// Returns `None` when the monitor is `Disconnected`: a poll that completes
/// after `stop()` has no effect.
pub(crate) fn step(
    current: LifecycleState,
    previous: Option<&ActivitySnapshot>,
    outcome: Result<ActivitySnapshot, PollFailure>,
) -> Option<Step> {
    if current == LifecycleState::Disconnected {
        return None;
    }

    let step = match outcome {
        Err(failure) => Step {
            state: LifecycleState::Error,
            snapshot: None,
            failure: Some(failure.clone()),
            notifications: vec![Notification::Error(failure)],
        },
        Ok(snapshot) if current == LifecycleState::Connected => {
            let notifications = if previous == Some(&snapshot) {
                Vec::new()
            } else {
                vec![Notification::Update(snapshot.clone())]
            };
            Step {
                state: LifecycleState::Connected,
                snapshot: Some(snapshot),
                failure: None,
                notifications,
            }
        }
        // Connecting or Error
        Ok(snapshot) => Step {
            state: LifecycleState::Connected,
            snapshot: Some(snapshot.clone()),
            failure: None,
            notifications: vec![Notification::Connected, Notification::Update(snapshot)],
        },
    };
    Some(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::test_fixtures::playing;

    fn network_failure() -> PollFailure {
        PollFailure {
            kind: FailureKind::NetworkFailure,
            reason: "timed out".into(),
        }
    }

    #[test]
    fn connecting_success_connects_and_updates() {
        let s = step(LifecycleState::Connecting, None, Ok(playing("Game A"))).unwrap();
        assert_eq!(s.state, LifecycleState::Connected);
        assert_eq!(
            s.notifications,
            vec![
                Notification::Connected,
                Notification::Update(playing("Game A"))
            ]
        );
    }

    #[test]
    fn failure_from_any_live_state_is_error() {
        for from in [
            LifecycleState::Connecting,
            LifecycleState::Connected,
            LifecycleState::Error,
        ] {
            let prev = playing("Game A");
            let s = step(from, Some(&prev), Err(network_failure())).unwrap();
            assert_eq!(s.state, LifecycleState::Error);
            assert!(s.snapshot.is_none());
            assert_eq!(s.failure, Some(network_failure()));
            assert_eq!(s.notifications, vec![Notification::Error(network_failure())]);
        }
    }

    #[test]
    fn unchanged_snapshot_is_silent() {
        let prev = playing("Game A");
        let s = step(LifecycleState::Connected, Some(&prev), Ok(playing("Game A"))).unwrap();
        assert_eq!(s.state, LifecycleState::Connected);
        assert!(s.notifications.is_empty());
    }

    #[test]
    fn changed_snapshot_updates() {
        let prev = playing("Game A");
        let s = step(LifecycleState::Connected, Some(&prev), Ok(playing("Game B"))).unwrap();
        assert_eq!(
            s.notifications,
            vec![Notification::Update(playing("Game B"))]
        );
    }

    #[test]
    fn recovery_from_error_reconnects() {
        let s = step(LifecycleState::Error, None, Ok(playing("Game A"))).unwrap();
        assert_eq!(s.state, LifecycleState::Connected);
        assert_eq!(s.notifications.len(), 2);
        assert_eq!(s.notifications[0], Notification::Connected);
    }

    #[test]
    fn disconnected_ignores_outcomes() {
        assert!(step(LifecycleState::Disconnected, None, Ok(playing("Game A"))).is_none());
        assert!(step(LifecycleState::Disconnected, None, Err(network_failure())).is_none());
    }

    #[test]
    fn state_display() {
        assert_eq!(LifecycleState::Connected.to_string(), "connected");
        assert_eq!(LifecycleState::default(), LifecycleState::Disconnected);
    }
}
