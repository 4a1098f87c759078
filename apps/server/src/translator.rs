//! Maps monitor events onto media-player entity attributes.
//!
//! Each configured account is exposed as one read-only media player. The
//! translator keeps the last published attributes per entity and only
//! reports an update when something visible changed.

use dashmap::DashMap;
use presence_core::{ActivitySnapshot, FailureKind, MonitorEvent, PresenceState};
use serde::Serialize;

/// Displayed state of a media-player entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    #[default]
    Unknown,
    Unavailable,
    On,
    Off,
    Playing,
}

/// Attributes published for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerAttributes {
    pub state: PlayerState,
    pub media_title: String,
    pub media_artist: String,
    pub media_image_url: String,
    /// Set after an authentication failure; the host should prompt for a
    /// fresh token instead of just showing the entity as unavailable.
    pub needs_reauth: bool,
}

impl PlayerAttributes {
    fn cleared(state: PlayerState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    fn from_snapshot(snapshot: &ActivitySnapshot) -> Self {
        let state = match snapshot.presence {
            PresenceState::Playing => PlayerState::Playing,
            PresenceState::Online => PlayerState::On,
            PresenceState::Offline => PlayerState::Off,
        };
        if state == PlayerState::Off {
            return Self::cleared(state);
        }
        let Some(title) = &snapshot.title else {
            return Self::cleared(state);
        };
        Self {
            state,
            media_title: title.name.clone(),
            media_artist: title
                .format
                .clone()
                .or_else(|| snapshot.platform.clone())
                .unwrap_or_default(),
            media_image_url: title.artwork_url.clone().unwrap_or_default(),
            needs_reauth: false,
        }
    }

    /// Names of the attributes that differ from `previous`.
    fn changed_from(&self, previous: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.state != previous.state {
            changed.push("state");
        }
        if self.media_title != previous.media_title {
            changed.push("media_title");
        }
        if self.media_artist != previous.media_artist {
            changed.push("media_artist");
        }
        if self.media_image_url != previous.media_image_url {
            changed.push("media_image_url");
        }
        if self.needs_reauth != previous.needs_reauth {
            changed.push("needs_reauth");
        }
        changed
    }
}

/// A change to publish for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeUpdate {
    pub entity_id: String,
    pub attributes: PlayerAttributes,
    /// Attribute names that changed since the last publish.
    pub changed: Vec<&'static str>,
}

#[derive(Default)]
struct EntityState {
    attributes: PlayerAttributes,
    snapshot: Option<ActivitySnapshot>,
}

/// Translates lifecycle events of any number of monitors.
#[derive(Default)]
pub struct Translator {
    entities: DashMap<String, EntityState>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current attributes for an entity, if it has seen any event.
    #[cfg(test)]
    pub fn attributes(&self, entity_id: &str) -> Option<PlayerAttributes> {
        self.entities.get(entity_id).map(|e| e.attributes.clone())
    }

    /// Applies one event. Returns the update to publish, if anything changed.
    pub fn apply(&self, event: &MonitorEvent) -> Option<AttributeUpdate> {
        let entity_id = event.account_id();
        let mut entity = self.entities.entry(entity_id.to_string()).or_default();

        let next = match event {
            // Connecting carries nothing displayable.
            MonitorEvent::Connecting { .. } => return None,
            MonitorEvent::Connected { .. } => match &entity.snapshot {
                Some(snapshot) => PlayerAttributes::from_snapshot(snapshot),
                None => PlayerAttributes::cleared(PlayerState::Unknown),
            },
            MonitorEvent::Update { snapshot, .. } => {
                entity.snapshot = Some(snapshot.clone());
                PlayerAttributes::from_snapshot(snapshot)
            }
            MonitorEvent::Disconnected { .. } => {
                entity.snapshot = None;
                PlayerAttributes::cleared(PlayerState::Off)
            }
            MonitorEvent::Error { failure, .. } => {
                entity.snapshot = None;
                PlayerAttributes {
                    needs_reauth: failure.kind == FailureKind::AuthenticationFailure,
                    ..PlayerAttributes::cleared(PlayerState::Unavailable)
                }
            }
        };

        let changed = next.changed_from(&entity.attributes);
        if changed.is_empty() {
            return None;
        }
        entity.attributes = next.clone();
        Some(AttributeUpdate {
            entity_id: entity_id.to_string(),
            attributes: next,
            changed,
        })
    }
}
