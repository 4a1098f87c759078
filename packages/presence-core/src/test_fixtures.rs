//! Shared test fixtures: provider payloads, a scripted client and a
//! recording emitter.
//!
//! These are used by multiple test modules to avoid duplication.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::activity::{AccountProfile, ActivitySnapshot, Credential, PresenceState, TitleInfo};
use crate::client::ActivityClient;
use crate::error::{PollError, PollResult};
use crate::events::{EventEmitter, EventKind, MonitorEvent};

/// "Me" profile response.
pub const PROFILE_ME: &str = r#"{
  "profile": {
    "onlineId": "player_one",
    "accountId": "1234567890123456789",
    "npId": "cGxheWVyX29uZUBhNi51cw==",
    "avatarUrls": []
  }
}"#;

/// Presence while a PS5 title is running.
pub const PRESENCE_PLAYING_PS5: &str = r#"{
  "basicPresence": {
    "availability": "availableToPlay",
    "primaryPlatformInfo": {
      "onlineStatus": "online",
      "platform": "PS5",
      "lastOnlineDate": "2024-05-01T18:00:00.000Z"
    },
    "gameTitleInfoList": [
      {
        "npTitleId": "PPSA01325_00",
        "titleName": "Game A",
        "format": "PS5",
        "launchPlatform": "PS5",
        "conceptIconUrl": "https://image.example/concept.png"
      }
    ]
  }
}"#;

/// Presence while a PS4 title is running on a PS5.
pub const PRESENCE_PLAYING_PS4: &str = r#"{
  "basicPresence": {
    "availability": "availableToPlay",
    "primaryPlatformInfo": {
      "onlineStatus": "online",
      "platform": "PS5",
      "lastOnlineDate": "2024-05-01T18:00:00.000Z"
    },
    "gameTitleInfoList": [
      {
        "npTitleId": "CUSA00419_00",
        "titleName": "Game B",
        "format": "PS4",
        "launchPlatform": "PS4",
        "npTitleIconUrl": "https://image.example/ps4icon.png"
      }
    ]
  }
}"#;

/// Online on the home screen.
pub const PRESENCE_ONLINE_IDLE: &str = r#"{
  "basicPresence": {
    "availability": "availableToPlay",
    "primaryPlatformInfo": {
      "onlineStatus": "online",
      "platform": "PS5",
      "lastOnlineDate": "2024-05-01T18:00:00.000Z"
    }
  }
}"#;

/// Console off.
pub const PRESENCE_OFFLINE: &str = r#"{
  "basicPresence": {
    "availability": "unavailable",
    "lastAvailableDate": "2024-05-01T20:00:00.000Z",
    "primaryPlatformInfo": {
      "onlineStatus": "offline",
      "platform": "PS5",
      "lastOnlineDate": "2024-05-01T20:00:00.000Z"
    }
  }
}"#;

/// A snapshot for `player_one` playing `title` on PS5.
pub fn playing(title: &str) -> ActivitySnapshot {
    ActivitySnapshot {
        online_id: "player_one".into(),
        presence: PresenceState::Playing,
        platform: Some("PS5".into()),
        title: Some(TitleInfo {
            title_id: format!("{}_00", title.replace(' ', "")),
            name: title.into(),
            format: Some("PS5".into()),
            artwork_url: None,
        }),
        started_at: None,
    }
}

pub fn profile() -> AccountProfile {
    AccountProfile {
        account_id: "1234567890123456789".into(),
        online_id: "player_one".into(),
    }
}

pub fn network_error() -> PollError {
    PollError::Network("connection refused".into())
}

pub fn auth_error() -> PollError {
    PollError::from_status(401, "token expired")
}

/// An [`ActivityClient`] that replays scripted outcomes.
///
/// When the verify script runs out, verification succeeds with [`profile`].
/// When the fetch script runs out, the last fetch outcome repeats (or an
/// offline snapshot if nothing was scripted).
#[derive(Default)]
pub struct ScriptedClient {
    verify_script: Mutex<VecDeque<PollResult<AccountProfile>>>,
    fetch_script: Mutex<VecDeque<PollResult<ActivitySnapshot>>>,
    last_fetch: Mutex<Option<PollResult<ActivitySnapshot>>>,
    fetch_delay: Mutex<Option<Duration>>,
    verify_block: Mutex<Option<Duration>>,
    session: AtomicBool,
    pub verify_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub release_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verify(self, results: Vec<PollResult<AccountProfile>>) -> Self {
        self.verify_script.lock().extend(results);
        self
    }

    pub fn with_fetch(self, results: Vec<PollResult<ActivitySnapshot>>) -> Self {
        self.fetch_script.lock().extend(results);
        self
    }

    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fetch_delay.lock() = Some(delay);
        self
    }

    /// Makes `verify` block its worker thread, like a request that is
    /// mid-flight when `stop` runs elsewhere.
    pub fn with_verify_block(self, duration: Duration) -> Self {
        *self.verify_block.lock() = Some(duration);
        self
    }

    /// True between the first request and the next `release`.
    pub fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityClient for ScriptedClient {
    async fn verify(&self, _credential: &Credential) -> PollResult<AccountProfile> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let block = *self.verify_block.lock();
        if let Some(block) = block {
            std::thread::sleep(block);
        }
        let next = self.verify_script.lock().pop_front();
        next.unwrap_or_else(|| Ok(profile()))
    }

    async fn fetch_activity(
        &self,
        _credential: &Credential,
        profile: &AccountProfile,
    ) -> PollResult<ActivitySnapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.session.store(true, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.fetch_script.lock().pop_front();
        match next {
            Some(result) => {
                *self.last_fetch.lock() = Some(result.clone());
                result
            }
            None => self
                .last_fetch
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(ActivitySnapshot::offline(profile.online_id.clone()))),
        }
    }

    fn release(&self) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.session.store(false, Ordering::SeqCst);
    }
}

/// Emitter that records every event it sees.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(MonitorEvent::kind).collect()
    }

    pub fn updates(&self) -> Vec<ActivitySnapshot> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::Update { snapshot, .. } => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: &MonitorEvent) {
        self.events.lock().push(event.clone());
    }
}
