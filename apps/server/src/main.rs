//! Presence Server - standalone headless host for the PSN presence bridge.
//!
//! Runs one account monitor per configured PSN account and translates their
//! lifecycle events into media-player attributes. Designed to run as a
//! background daemon next to the home-remote integration it feeds.

mod accounts;
mod config;
mod translator;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use presence_core::{BroadcastEventBridge, LoggingEventEmitter, MonitorEvent};
use tokio::signal;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::accounts::AccountTable;
use crate::config::ServerConfig;
use crate::translator::Translator;

/// Capacity of the event channel between monitors and the translator.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the translator to drain after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Presence Server - PlayStation Network presence as a media-player entity.
#[derive(Parser, Debug)]
#[command(name = "presence-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "PRESENCE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Poll interval in seconds (overrides config file).
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Presence Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(interval) = args.poll_interval {
        config.poll_interval = interval;
    }

    config.validate().context("Invalid configuration")?;

    log::info!(
        "Configuration: accounts={}, poll_interval={}s, auth_backoff={}s",
        config.accounts.len(),
        config.poll_interval,
        config.auth_backoff
    );

    let bridge = BroadcastEventBridge::new(EVENT_CHANNEL_CAPACITY);
    if args.log_level >= log::LevelFilter::Debug {
        bridge.set_external_emitter(Arc::new(LoggingEventEmitter));
    }

    // Subscribe before any monitor starts so no event is missed.
    let translator_task = tokio::spawn(run_translator(bridge.stream()));

    let accounts = AccountTable::build(
        &config.accounts,
        &config.to_monitor_config(),
        Arc::new(bridge.clone()),
        tokio::runtime::Handle::current(),
    )
    .context("Failed to set up account monitors")?;
    if accounts.is_empty() {
        bail!("No accounts configured. Add at least one entry under `accounts:`");
    }

    if accounts.connect_all() == 0 {
        log::warn!("No monitor could be started; waiting for shutdown");
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    accounts.disconnect_all();

    // Dropping every sender ends the translator's stream once it has seen
    // the final Disconnected events.
    drop(accounts);
    drop(bridge);
    if tokio::time::timeout(DRAIN_TIMEOUT, translator_task)
        .await
        .is_err()
    {
        log::warn!("Translator did not drain within {:?}", DRAIN_TIMEOUT);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Consumes monitor events and logs the resulting attribute changes.
async fn run_translator(mut events: BroadcastStream<MonitorEvent>) {
    let translator = Translator::new();
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                let Some(update) = translator.apply(&event) else {
                    continue;
                };
                match serde_json::to_string(&update.attributes) {
                    Ok(json) => log::info!(
                        "[Translator] {} changed {:?}: {}",
                        update.entity_id,
                        update.changed,
                        json
                    ),
                    Err(e) => log::error!("[Translator] Failed to encode attributes: {}", e),
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::warn!("[Translator] Lagged behind, skipped {} events", skipped);
            }
        }
    }
    log::debug!("[Translator] Event stream closed");
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
