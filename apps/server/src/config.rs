//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use presence_core::{Credential, MonitorConfig, DEFAULT_API_BASE_URL};
use serde::Deserialize;

/// One PSN account to monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Unique identifier; becomes the media-player entity id.
    pub identifier: String,

    /// Friendly name used in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// NPSSO-derived bearer token. Never logged.
    pub token: Credential,
}

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Seconds between the end of one poll and the start of the next.
    /// Override: `PRESENCE_POLL_INTERVAL`
    pub poll_interval: u64,

    /// Seconds to wait after an authentication failure.
    /// Override: `PRESENCE_AUTH_BACKOFF`
    pub auth_backoff: u64,

    /// Per-request timeout in seconds.
    pub request_timeout: u64,

    /// PSN API root.
    /// Override: `PRESENCE_API_BASE_URL`
    pub api_base_url: String,

    /// Accounts to monitor, one monitor each.
    pub accounts: Vec<AccountConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            poll_interval: monitor.poll_interval.as_secs(),
            auth_backoff: monitor.auth_backoff.as_secs(),
            request_timeout: monitor.request_timeout.as_secs(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            accounts: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("PRESENCE_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll_interval = interval;
        }

        if let Some(backoff) = lookup("PRESENCE_AUTH_BACKOFF").and_then(|v| v.parse().ok()) {
            self.auth_backoff = backoff;
        }

        if let Some(url) = lookup("PRESENCE_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }

        // Note: PRESENCE_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Checks account entries and timing values.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.identifier.trim().is_empty() {
                bail!("Account identifier must not be empty");
            }
            if !seen.insert(account.identifier.as_str()) {
                bail!("Duplicate account identifier: {}", account.identifier);
            }
        }
        self.to_monitor_config()
            .validate()
            .context("Invalid monitor settings")?;
        Ok(())
    }

    /// Converts to presence-core's MonitorConfig type.
    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.poll_interval),
            auth_backoff: Duration::from_secs(self.auth_backoff),
            request_timeout: Duration::from_secs(self.request_timeout),
            api_base_url: self.api_base_url.clone(),
        }
    }
}
