//! Centralized error types for the presence core library.
//!
//! Two families of errors exist:
//! - [`PollError`]: failures of a single network round-trip. These never leave
//!   the account monitor; they are classified and turned into `Error` events.
//! - [`MonitorError`]: caller-side precondition violations (empty credential,
//!   invalid configuration) returned synchronously from the public API.

use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

/// Coarse classification attached to every `Error` event.
///
/// The host UI uses this to decide between prompting for re-authentication
/// and simply showing the entity as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Bad or expired credential. Will not heal on its own.
    AuthenticationFailure,
    /// Timeout, refused connection, DNS, rate limiting or provider outage.
    NetworkFailure,
    /// Malformed or unexpectedly shaped payload.
    UnexpectedResponse,
}

impl FailureKind {
    /// Returns true if retrying at the normal cadence is expected to help.
    #[must_use]
    pub fn is_transient(self) -> bool {
        !matches!(self, FailureKind::AuthenticationFailure)
    }
}

/// Errors produced by a single poll or verification call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    /// The provider rejected the credential.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never produced a usable HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered, but not with what we expected.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Convenient Result alias for network operations against the provider.
pub type PollResult<T> = Result<T, PollError>;

impl PollError {
    /// Returns the failure bucket for this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication(_) => FailureKind::AuthenticationFailure,
            Self::Network(_) => FailureKind::NetworkFailure,
            Self::UnexpectedResponse(_) => FailureKind::UnexpectedResponse,
        }
    }

    /// Returns the human-readable reason without the classification prefix.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Authentication(r) | Self::Network(r) | Self::UnexpectedResponse(r) => r,
        }
    }

    /// Classifies a non-success HTTP status returned by the provider.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let reason = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body)
        };
        match status {
            401 | 403 => Self::Authentication(reason),
            429 | 500..=599 => Self::Network(reason),
            _ => Self::UnexpectedResponse(reason),
        }
    }
}

impl ErrorCode for PollError {
    fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "auth_failure",
            Self::Network(_) => "network_failure",
            Self::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), "");
        }
        if err.is_decode() {
            Self::UnexpectedResponse(err.to_string())
        } else {
            // timeouts, connect failures, DNS and body transport errors
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnexpectedResponse(err.to_string())
    }
}

/// The payload of an `Error` lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollFailure {
    /// Which bucket the failure fell into.
    pub kind: FailureKind,
    /// Human-readable description, safe to log.
    pub reason: String,
}

impl From<&PollError> for PollFailure {
    fn from(err: &PollError) -> Self {
        Self {
            kind: err.kind(),
            reason: err.reason().to_string(),
        }
    }
}

/// Errors returned synchronously to callers of the monitor API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// `start` was called with an empty credential.
    #[error("Credential must not be empty")]
    EmptyCredential,

    /// The supplied configuration would break the poll loop.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ErrorCode for MonitorError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyCredential => "empty_credential",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Convenient Result alias for monitor API calls.
pub type MonitorResult<T> = Result<T, MonitorError>;
