//! Account and activity value types.
//!
//! These are the payloads that travel through the monitor: the caller-supplied
//! [`Credential`], the [`AccountProfile`] learned during verification, and the
//! [`ActivitySnapshot`] produced by every successful poll.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque bearer credential for one account.
///
/// Owned by the caller and handed to the monitor at `start`. The value is
/// never logged; `Debug` prints a redacted placeholder.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns true if the token is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the raw token for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Identity returned by the verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    /// Provider-side numeric account id (as a string).
    pub account_id: String,
    /// Public display name.
    pub online_id: String,
}

/// Coarse presence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PresenceState {
    /// No console is online for the account.
    #[default]
    Offline,
    /// A console is online but no title is running.
    Online,
    /// A title is running.
    Playing,
}

/// The title currently being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleInfo {
    /// Provider title id (e.g. `PPSA01325_00`).
    pub title_id: String,
    /// Display name of the title.
    pub name: String,
    /// Format the title runs as (`PS5`, `PS4`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Artwork URL chosen for the title's format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
}

/// Decoded result of one successful poll.
///
/// Replaced wholesale on every poll. Equality is structural; the monitor
/// suppresses `Update` events when two consecutive snapshots compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    /// Online id of the monitored account.
    pub online_id: String,
    /// Coarse presence.
    pub presence: PresenceState,
    /// Platform the account is online on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Current title, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<TitleInfo>,
    /// Provider timestamp for the start of the platform session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

impl ActivitySnapshot {
    /// A snapshot for an account with nothing online.
    pub fn offline(online_id: impl Into<String>) -> Self {
        Self {
            online_id: online_id.into(),
            presence: PresenceState::Offline,
            platform: None,
            title: None,
            started_at: None,
        }
    }

    /// Returns true if a title is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.presence == PresenceState::Playing
    }

    /// Returns the title name, if any.
    #[must_use]
    pub fn title_name(&self) -> Option<&str> {
        self.title.as_ref().map(|t| t.name.as_str())
    }
}
