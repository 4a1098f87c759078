//! PlayStation Network implementation of [`ActivityClient`].

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::presence::{PresenceResponse, ProfileResponse};
use super::ActivityClient;
use crate::activity::{AccountProfile, ActivitySnapshot, Credential};
use crate::config::MonitorConfig;
use crate::error::{PollError, PollResult};
use crate::utils::truncate_body;

/// Longest response body quoted in an error reason.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP client for the PSN user-profile API.
///
/// The underlying `reqwest::Client` is created on first use and dropped by
/// [`ActivityClient::release`], so a stopped monitor holds no open
/// connections.
pub struct PsnClient {
    base_url: String,
    timeout: Duration,
    http: RwLock<Option<Client>>,
}

impl PsnClient {
    /// Creates a client for the given API root.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http: RwLock::new(None),
        }
    }

    /// Creates a client from a monitor configuration.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.api_base_url.clone(), config.request_timeout)
    }

    #[cfg(test)]
    fn has_session(&self) -> bool {
        self.http.read().is_some()
    }

    fn profile_url(&self) -> String {
        format!("{}/userProfile/v1/internal/users/me/profiles", self.base_url)
    }

    fn presence_url(&self, account_id: &str) -> String {
        format!(
            "{}/userProfile/v1/internal/users/{}/basicPresences?type=primary",
            self.base_url, account_id
        )
    }

    fn http(&self) -> PollResult<Client> {
        if let Some(client) = self.http.read().as_ref() {
            return Ok(client.clone());
        }
        let mut slot = self.http.write();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PollError::Network(format!("failed to build HTTP client: {}", e)))?;
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> PollResult<T> {
        let response = self
            .http()?
            .get(url)
            .bearer_auth(credential.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::debug!("[PsnClient] GET {} returned HTTP {}", url, status.as_u16());
            return Err(PollError::from_status(
                status.as_u16(),
                &truncate_body(&body, MAX_ERROR_BODY_CHARS),
            ));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ActivityClient for PsnClient {
    async fn verify(&self, credential: &Credential) -> PollResult<AccountProfile> {
        let response: ProfileResponse = self.get_json(&self.profile_url(), credential).await?;
        let profile = response.into_profile()?;
        log::info!(
            "[PsnClient] Verified credential for {} ({})",
            profile.online_id,
            profile.account_id
        );
        Ok(profile)
    }

    async fn fetch_activity(
        &self,
        credential: &Credential,
        profile: &AccountProfile,
    ) -> PollResult<ActivitySnapshot> {
        let response: PresenceResponse = self
            .get_json(&self.presence_url(&profile.account_id), credential)
            .await?;
        response.into_snapshot(&profile.online_id)
    }

    fn release(&self) {
        if self.http.write().take().is_some() {
            log::debug!("[PsnClient] Released HTTP session");
        }
    }
}
