//! Account table: one independent monitor per configured account.

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use presence_core::{AccountInfo, AccountMonitor, Credential, EventEmitter, MonitorConfig};
use tokio::runtime::Handle;

use crate::config::AccountConfig;

/// Owns the monitors and the credentials they were configured with.
pub struct AccountTable {
    monitors: DashMap<String, (AccountMonitor, Credential)>,
}

impl AccountTable {
    /// Creates one PSN-backed monitor per account, polling on `runtime`, and
    /// attaches `emitter` to each of them.
    pub fn build(
        accounts: &[AccountConfig],
        config: &MonitorConfig,
        emitter: Arc<dyn EventEmitter>,
        runtime: Handle,
    ) -> Result<Self> {
        let monitors = DashMap::new();
        for account in accounts {
            let mut info = AccountInfo::new(account.identifier.clone());
            if let Some(name) = &account.name {
                info = info.with_name(name.clone());
            }
            let monitor = AccountMonitor::psn(info, config.clone(), runtime.clone())
                .with_context(|| format!("Failed to create monitor for {}", account.identifier))?;
            monitor.attach(Arc::clone(&emitter));
            monitors.insert(
                account.identifier.clone(),
                (monitor, account.token.clone()),
            );
        }
        Ok(Self { monitors })
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// State of one account's monitor.
    #[cfg(test)]
    pub fn state(&self, identifier: &str) -> Option<presence_core::LifecycleState> {
        self.monitors
            .get(identifier)
            .map(|entry| entry.0.current_state())
    }

    /// Starts every monitor. Returns how many were started.
    ///
    /// Accounts whose credential is rejected up front are logged and skipped;
    /// the others keep running.
    pub fn connect_all(&self) -> usize {
        let mut started = 0;
        for entry in self.monitors.iter() {
            let (monitor, credential) = entry.value();
            match monitor.start(credential.clone()) {
                Ok(()) => started += 1,
                Err(e) => log::error!("[Accounts] Cannot start {}: {}", monitor.log_id(), e),
            }
        }
        log::info!("[Accounts] Started {}/{} monitors", started, self.len());
        started
    }

    /// Stops every monitor.
    pub fn disconnect_all(&self) {
        for entry in self.monitors.iter() {
            entry.value().0.stop();
        }
        log::info!("[Accounts] All monitors stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_core::{LifecycleState, NoopEventEmitter};

    fn account(identifier: &str, token: &str) -> AccountConfig {
        AccountConfig {
            identifier: identifier.into(),
            name: None,
            token: Credential::new(token),
        }
    }

    #[tokio::test]
    async fn builds_one_monitor_per_account() {
        let table = AccountTable::build(
            &[account("a", "t1"), account("b", "t2")],
            &MonitorConfig::default(),
            Arc::new(NoopEventEmitter),
            Handle::current(),
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.state("a"), Some(LifecycleState::Disconnected));
        assert_eq!(table.state("missing"), None);
    }

    #[tokio::test]
    async fn empty_credentials_are_skipped() {
        let table = AccountTable::build(
            &[account("a", ""), account("b", "   ")],
            &MonitorConfig::default(),
            Arc::new(NoopEventEmitter),
            Handle::current(),
        )
        .unwrap();

        assert_eq!(table.connect_all(), 0);
        assert_eq!(table.state("a"), Some(LifecycleState::Disconnected));
        table.disconnect_all();
    }

    #[tokio::test]
    async fn invalid_monitor_config_fails_build() {
        let config = MonitorConfig {
            api_base_url: String::new(),
            ..MonitorConfig::default()
        };
        let result = AccountTable::build(
            &[account("a", "t1")],
            &config,
            Arc::new(NoopEventEmitter),
            Handle::current(),
        );
        assert!(result.is_err());
    }
}
