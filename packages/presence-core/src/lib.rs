//! Presence Core - account monitoring for the PSN presence bridge.
//!
//! This crate keeps a long-lived logical connection to one PlayStation Network
//! account, polls its activity on a fixed cadence and publishes lifecycle
//! events that a host translates into a read-only media-player entity.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`monitor`]: The account monitor state machine and its poll loop
//! - [`client`]: Provider access (`ActivityClient` trait, PSN implementation)
//! - [`events`]: Lifecycle events, listener registry and emitters
//! - [`activity`]: Credential, profile and activity snapshot types
//! - [`config`]: Poll cadence and endpoint configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`ActivityClient`](client::ActivityClient): Verifying credentials and fetching activity
//! - [`EventEmitter`](events::EventEmitter): Consuming the whole event stream
//!
//! One monitor handles exactly one account. Hosts that manage several
//! accounts create one monitor per account; monitors share nothing.

#![warn(clippy::all)]

pub mod activity;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod monitor;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use activity::{AccountProfile, ActivitySnapshot, Credential, PresenceState, TitleInfo};
pub use client::{ActivityClient, PsnClient};
pub use config::{MonitorConfig, DEFAULT_API_BASE_URL};
pub use error::{
    ErrorCode, FailureKind, MonitorError, MonitorResult, PollError, PollFailure, PollResult,
};
pub use events::{
    BroadcastEventBridge, EventEmitter, EventKind, ListenerHandle, LoggingEventEmitter,
    MonitorEvent, NoopEventEmitter,
};
pub use monitor::{AccountInfo, AccountMonitor, LifecycleState};
pub use utils::now_millis;
