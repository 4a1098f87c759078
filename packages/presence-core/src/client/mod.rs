//! Provider access for the account monitor.
//!
//! The monitor depends on the [`ActivityClient`] trait rather than a concrete
//! HTTP client, so its state machine can be driven by scripted outcomes in
//! tests. [`PsnClient`] is the PlayStation Network implementation.

mod presence;
mod psn;

pub use presence::{PresenceResponse, ProfileResponse};
pub use psn::PsnClient;

use async_trait::async_trait;

use crate::activity::{AccountProfile, ActivitySnapshot, Credential};
use crate::error::PollResult;

/// The network operations an account monitor needs.
///
/// Implementations classify every failure into a [`PollError`](crate::PollError);
/// they must never panic on provider input.
#[async_trait]
pub trait ActivityClient: Send + Sync {
    /// Validates the credential and resolves the account it belongs to.
    ///
    /// Called once per run, and again after any authentication failure.
    async fn verify(&self, credential: &Credential) -> PollResult<AccountProfile>;

    /// Fetches the account's current activity.
    async fn fetch_activity(
        &self,
        credential: &Credential,
        profile: &AccountProfile,
    ) -> PollResult<ActivitySnapshot>;

    /// Drops any pooled connections. The next call may open a fresh session.
    fn release(&self) {}
}
