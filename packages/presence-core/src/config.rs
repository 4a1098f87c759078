//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Default PlayStation Network API root.
pub const DEFAULT_API_BASE_URL: &str = "https://m.np.playstation.com/api";

/// Timing and endpoint configuration for one account monitor.
///
/// All fields have sensible defaults. Durations are measured between poll
/// completions, never between schedule ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay after a completed poll before the next one starts.
    #[serde(with = "secs")]
    pub poll_interval: Duration,

    /// Delay after an authentication failure. A bad credential will not
    /// heal on its own, so this is much longer than `poll_interval`.
    #[serde(with = "secs")]
    pub auth_backoff: Duration,

    /// Per-request timeout for provider calls.
    #[serde(with = "secs")]
    pub request_timeout: Duration,

    /// Root URL of the provider API (no trailing slash).
    pub api_base_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(45),
            auth_backoff: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if any value would cause
    /// runtime issues (busy-looping timers or unroutable requests).
    pub fn validate(&self) -> MonitorResult<()> {
        if self.poll_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "poll_interval must be > 0".to_string(),
            ));
        }
        if self.auth_backoff.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "auth_backoff must be > 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "request_timeout must be > 0".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "api_base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the delay to wait after a failure of the given kind.
    #[must_use]
    pub fn retry_delay(&self, kind: crate::error::FailureKind) -> Duration {
        if kind.is_transient() {
            self.poll_interval
        } else {
            self.auth_backoff
        }
    }
}

/// Whole-second (de)serialization for `Duration` fields.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
