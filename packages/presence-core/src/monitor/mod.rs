//! Account monitor: one account's connection lifecycle and poll loop.
//!
//! An [`AccountMonitor`] owns a single background task that verifies the
//! credential, polls the account's activity on a fixed cadence and turns each
//! outcome into lifecycle events. The task is re-armed only after a poll
//! completes, so there is never more than one request in flight.
//!
//! ```text
//!  Disconnected --start--> Connecting --ok--> Connected <--ok--> Connected
//!        ^                     |                  |  ^
//!        |                    err                err |ok
//!       stop                   v                  v  |
//!        +------------------ Error <------------- Error
//! ```

mod delivery;
mod transition;

pub use transition::LifecycleState;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::activity::{AccountProfile, ActivitySnapshot, Credential};
use crate::client::{ActivityClient, PsnClient};
use crate::config::MonitorConfig;
use crate::error::{FailureKind, MonitorError, MonitorResult, PollFailure, PollResult};
use crate::events::{EventEmitter, EventKind, ListenerHandle, ListenerRegistry, MonitorEvent};
use crate::utils::now_millis;

use delivery::{DeliveryQueue, Envelope};
use transition::Notification;

/// Identity of the monitored account, as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Stable identifier; carried on every event.
    pub identifier: String,
    /// Optional display name used in logs.
    pub name: Option<String>,
}

impl AccountInfo {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Mutable run state, guarded by one lock.
#[derive(Default)]
struct RunState {
    state: LifecycleState,
    snapshot: Option<ActivitySnapshot>,
    last_failure: Option<PollFailure>,
    /// Incremented on every `start` and `stop`. Transitions and queued events
    /// from an older epoch are discarded.
    epoch: u64,
    /// Present exactly while the poll loop is supposed to run.
    cancel: Option<CancellationToken>,
}

struct Inner {
    account: AccountInfo,
    client: Arc<dyn ActivityClient>,
    config: MonitorConfig,
    runtime: Handle,
    run: RwLock<RunState>,
    listeners: ListenerRegistry,
    delivery: DeliveryQueue,
}

/// Maintains the connection lifecycle of one account.
///
/// Cheap to clone; clones share the same monitor. Dropping the last clone
/// cancels the poll loop without emitting `Disconnected`.
///
/// # Thread Safety
///
/// All methods take `&self` and may be called from any thread, including
/// from inside a listener callback. Callbacks for one monitor never run
/// concurrently and observe events in transition order.
#[derive(Clone)]
pub struct AccountMonitor {
    inner: Arc<Inner>,
}

impl AccountMonitor {
    /// Creates a monitor for `account` polling through `client`. The poll loop
    /// is spawned onto `runtime`, so `start` may be called from any thread.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        account: AccountInfo,
        client: Arc<dyn ActivityClient>,
        config: MonitorConfig,
        runtime: Handle,
    ) -> MonitorResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                account,
                client,
                config,
                runtime,
                run: RwLock::new(RunState::default()),
                listeners: ListenerRegistry::new(),
                delivery: DeliveryQueue::default(),
            }),
        })
    }

    /// Creates a monitor backed by a [`PsnClient`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if `config` fails validation.
    pub fn psn(
        account: AccountInfo,
        config: MonitorConfig,
        runtime: Handle,
    ) -> MonitorResult<Self> {
        let client = Arc::new(PsnClient::from_config(&config));
        Self::new(account, client, config, runtime)
    }

    /// The account identifier carried on every event.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.inner.account.identifier
    }

    /// Name used in log lines: the display name if set, else the identifier.
    #[must_use]
    pub fn log_id(&self) -> &str {
        self.inner.log_id()
    }

    /// Starts monitoring with `credential`.
    ///
    /// Emits `Connecting` and spawns the poll loop. Calling `start` while the
    /// monitor is running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::EmptyCredential`] for an empty or blank token.
    pub fn start(&self, credential: Credential) -> MonitorResult<()> {
        if credential.is_empty() {
            return Err(MonitorError::EmptyCredential);
        }

        let (epoch, cancel) = {
            let mut run = self.inner.run.write();
            if run.cancel.is_some() {
                log::debug!(
                    "[AccountMonitor] {} already running, ignoring start",
                    self.log_id()
                );
                return Ok(());
            }
            run.epoch += 1;
            run.state = LifecycleState::Connecting;
            run.snapshot = None;
            run.last_failure = None;
            let cancel = CancellationToken::new();
            run.cancel = Some(cancel.clone());
            let connecting = self.inner.event(|account_id, timestamp| {
                MonitorEvent::Connecting {
                    account_id,
                    timestamp,
                }
            });
            self.inner
                .delivery
                .push(Envelope::tagged(connecting, run.epoch));
            (run.epoch, cancel)
        };

        log::info!("[AccountMonitor] {} connecting", self.log_id());

        let poll_loop = PollLoop {
            monitor: Arc::downgrade(&self.inner),
            client: Arc::clone(&self.inner.client),
            config: self.inner.config.clone(),
            credential,
            epoch,
            cancel,
            log_id: self.log_id().to_string(),
        };
        self.inner.runtime.spawn(poll_loop.run());

        self.inner.flush();
        Ok(())
    }

    /// Stops monitoring.
    ///
    /// Cancels any in-flight request and the pending timer, releases the
    /// network session and emits `Disconnected`. Does nothing if the monitor
    /// is not running.
    pub fn stop(&self) {
        let cancel = {
            let mut run = self.inner.run.write();
            let Some(cancel) = run.cancel.take() else {
                return;
            };
            run.epoch += 1;
            run.state = LifecycleState::Disconnected;
            run.snapshot = None;
            run.last_failure = None;
            let disconnected = self.inner.event(|account_id, timestamp| {
                MonitorEvent::Disconnected {
                    account_id,
                    timestamp,
                }
            });
            self.inner.delivery.push(Envelope::untagged(disconnected));
            cancel
        };

        cancel.cancel();
        self.inner.client.release();
        log::info!("[AccountMonitor] {} disconnected", self.log_id());

        self.inner.flush();
    }

    /// Returns true between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.run.read().cancel.is_some()
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn current_state(&self) -> LifecycleState {
        self.inner.run.read().state
    }

    /// The last snapshot, or `None` unless the monitor is `Connected`.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<ActivitySnapshot> {
        let run = self.inner.run.read();
        match run.state {
            LifecycleState::Connected => run.snapshot.clone(),
            _ => None,
        }
    }

    /// The failure behind the current `Error` state, if any.
    #[must_use]
    pub fn last_failure(&self) -> Option<PollFailure> {
        self.inner.run.read().last_failure.clone()
    }

    /// Registers `callback` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> ListenerHandle
    where
        F: Fn(&MonitorEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(kind, Arc::new(callback))
    }

    /// Removes a registration. Returns false if it was already removed.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        self.inner.listeners.unsubscribe(handle)
    }

    /// Subscribes `emitter` to every event kind.
    pub fn attach(&self, emitter: Arc<dyn EventEmitter>) -> Vec<ListenerHandle> {
        let listener: crate::events::Listener = Arc::new(move |event| emitter.emit(event));
        EventKind::ALL
            .iter()
            .map(|kind| self.inner.listeners.subscribe(*kind, Arc::clone(&listener)))
            .collect()
    }
}

impl std::fmt::Debug for AccountMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountMonitor")
            .field("account", &self.inner.account)
            .field("state", &self.current_state())
            .finish()
    }
}

impl Inner {
    fn log_id(&self) -> &str {
        self.account
            .name
            .as_deref()
            .unwrap_or(&self.account.identifier)
    }

    fn event<F>(&self, make: F) -> MonitorEvent
    where
        F: FnOnce(String, u64) -> MonitorEvent,
    {
        make(self.account.identifier.clone(), now_millis())
    }

    fn notification_event(&self, notification: Notification) -> MonitorEvent {
        self.event(|account_id, timestamp| match notification {
            Notification::Connected => MonitorEvent::Connected {
                account_id,
                timestamp,
            },
            Notification::Update(snapshot) => MonitorEvent::Update {
                account_id,
                snapshot,
                timestamp,
            },
            Notification::Error(failure) => MonitorEvent::Error {
                account_id,
                failure,
                timestamp,
            },
        })
    }

    /// Applies a completed poll. Returns false if the loop should exit.
    fn apply(&self, epoch: u64, outcome: PollResult<ActivitySnapshot>) -> bool {
        let outcome = outcome.map_err(|err| PollFailure::from(&err));
        {
            let mut run = self.run.write();
            if run.epoch != epoch || run.cancel.is_none() {
                return false;
            }
            let Some(step) = transition::step(run.state, run.snapshot.as_ref(), outcome) else {
                return false;
            };

            if step.state != run.state {
                log::info!(
                    "[AccountMonitor] {} {} -> {}",
                    self.log_id(),
                    run.state,
                    step.state
                );
            }
            if let Some(failure) = &step.failure {
                log::warn!(
                    "[AccountMonitor] {} poll failed ({:?}): {}",
                    self.log_id(),
                    failure.kind,
                    failure.reason
                );
            }

            for notification in &step.notifications {
                if let Notification::Update(snapshot) = notification {
                    match snapshot.title_name() {
                        Some(title) if snapshot.is_playing() => {
                            log::info!("[AccountMonitor] {} playing {}", self.log_id(), title)
                        }
                        _ => log::debug!(
                            "[AccountMonitor] {} presence {:?}",
                            self.log_id(),
                            snapshot.presence
                        ),
                    }
                }
            }

            run.state = step.state;
            run.snapshot = step.snapshot;
            run.last_failure = step.failure;
            for notification in step.notifications {
                self.delivery
                    .push(Envelope::tagged(self.notification_event(notification), epoch));
            }
        }
        self.flush();
        true
    }

    fn is_live(&self, epoch: Option<u64>) -> bool {
        match epoch {
            Some(epoch) => self.run.read().epoch == epoch,
            None => true,
        }
    }

    /// Delivers every queued event. Never holds the state lock while a
    /// callback runs.
    fn flush(&self) {
        self.delivery.drain(|envelope| self.deliver(envelope));
    }

    fn deliver(&self, envelope: &Envelope) {
        let kind = envelope.event.kind();
        for (handle, listener) in self.listeners.snapshot(kind) {
            if !self.is_live(envelope.epoch) {
                log::trace!(
                    "[AccountMonitor] {} dropping stale {:?} event",
                    self.log_id(),
                    kind
                );
                return;
            }
            // Removed by an earlier callback for this same event.
            if !self.listeners.is_registered(handle) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(&envelope.event))).is_err() {
                log::error!(
                    "[AccountMonitor] {} {:?} listener panicked",
                    self.log_id(),
                    kind
                );
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(cancel) = self.run.get_mut().cancel.take() {
            cancel.cancel();
        }
    }
}

/// The background task of one monitor run.
///
/// Holds only a weak reference to the monitor so an abandoned monitor does
/// not keep polling.
struct PollLoop {
    monitor: Weak<Inner>,
    client: Arc<dyn ActivityClient>,
    config: MonitorConfig,
    credential: Credential,
    epoch: u64,
    cancel: CancellationToken,
    log_id: String,
}

impl PollLoop {
    async fn run(self) {
        let mut profile: Option<AccountProfile> = None;

        loop {
            let poll = poll_once(self.client.as_ref(), &self.credential, &mut profile);
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = poll => outcome,
            };

            let delay = match &outcome {
                Ok(_) => self.config.poll_interval,
                Err(err) => {
                    if err.kind() == FailureKind::AuthenticationFailure {
                        // re-verify on the next attempt
                        profile = None;
                    }
                    self.config.retry_delay(err.kind())
                }
            };

            let Some(monitor) = self.monitor.upgrade() else {
                break;
            };
            if !monitor.apply(self.epoch, outcome) {
                break;
            }
            drop(monitor);

            log::debug!(
                "[AccountMonitor] {} next poll in {}s",
                self.log_id,
                delay.as_secs()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // A request that was already running when `stop` released the
        // session may have opened a new one.
        let idle = match self.monitor.upgrade() {
            Some(monitor) => {
                let running = monitor.run.read().cancel.is_some();
                !running
            }
            None => true,
        };
        if idle {
            self.client.release();
        }

        log::debug!("[AccountMonitor] {} poll loop exited", self.log_id);
    }
}

/// Verifies the credential if needed, then fetches activity.
async fn poll_once(
    client: &dyn ActivityClient,
    credential: &Credential,
    profile: &mut Option<AccountProfile>,
) -> PollResult<ActivitySnapshot> {
    let verified = match profile.clone() {
        Some(verified) => verified,
        None => {
            let verified = client.verify(credential).await?;
            *profile = Some(verified.clone());
            verified
        }
    };
    client.fetch_activity(credential, &verified).await
}
