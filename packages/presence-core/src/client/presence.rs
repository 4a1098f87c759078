//! Wire shapes for the PSN user-profile API and their decoding.
//!
//! Every field is optional on the wire; decoding decides which absences are
//! tolerable (no title running) and which make the payload unusable (no
//! `basicPresence` block at all).

use serde::Deserialize;

use crate::activity::{AccountProfile, ActivitySnapshot, PresenceState, TitleInfo};
use crate::error::{PollError, PollResult};

const ONLINE: &str = "online";
const AVAILABLE_TO_PLAY: &str = "availableToPlay";

/// Response body of the "me" profile endpoint.
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    profile: Option<ProfileJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProfileJson {
    account_id: Option<String>,
    online_id: Option<String>,
}

impl ProfileResponse {
    /// Extracts the account identity.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::UnexpectedResponse`] if the profile block or the
    /// account id is missing.
    pub fn into_profile(self) -> PollResult<AccountProfile> {
        let profile = self
            .profile
            .ok_or_else(|| PollError::UnexpectedResponse("missing profile".to_string()))?;
        let account_id = profile
            .account_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PollError::UnexpectedResponse("missing accountId".to_string()))?;
        Ok(AccountProfile {
            online_id: profile.online_id.unwrap_or_else(|| account_id.clone()),
            account_id,
        })
    }
}

/// Response body of the basic presence endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    basic_presence: Option<BasicPresenceJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BasicPresenceJson {
    availability: Option<String>,
    primary_platform_info: Option<PlatformInfoJson>,
    game_title_info_list: Vec<GameTitleJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlatformInfoJson {
    online_status: Option<String>,
    platform: Option<String>,
    last_online_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GameTitleJson {
    np_title_id: Option<String>,
    title_name: Option<String>,
    format: Option<String>,
    concept_icon_url: Option<String>,
    np_title_icon_url: Option<String>,
}

impl GameTitleJson {
    /// PS5 titles publish concept art, PS4 titles an NP title icon.
    fn artwork_url(&self) -> Option<String> {
        match self.format.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("PS5") => self.concept_icon_url.clone(),
            Some("PS4") => self.np_title_icon_url.clone(),
            _ => None,
        }
    }

    fn into_title(self) -> Option<TitleInfo> {
        let title_id = self.np_title_id.clone().filter(|id| !id.is_empty())?;
        let artwork_url = self.artwork_url();
        Some(TitleInfo {
            name: self.title_name.unwrap_or_else(|| title_id.clone()),
            title_id,
            format: self.format,
            artwork_url,
        })
    }
}

impl PresenceResponse {
    /// Decodes the presence payload into a snapshot for `online_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::UnexpectedResponse`] if `basicPresence` is absent.
    pub fn into_snapshot(self, online_id: &str) -> PollResult<ActivitySnapshot> {
        let presence = self.basic_presence.ok_or_else(|| {
            PollError::UnexpectedResponse("missing basicPresence".to_string())
        })?;

        let available = presence.availability.as_deref() == Some(AVAILABLE_TO_PLAY);
        let platform_info = presence.primary_platform_info.unwrap_or_default();
        let online = platform_info.platform.as_deref().is_some_and(|p| !p.is_empty())
            && platform_info.online_status.as_deref() == Some(ONLINE);

        let title = presence
            .game_title_info_list
            .into_iter()
            .next()
            .and_then(GameTitleJson::into_title);

        let state = match (online, available, title.is_some()) {
            (true, true, true) => PresenceState::Playing,
            (true, _, _) => PresenceState::Online,
            _ => PresenceState::Offline,
        };

        Ok(ActivitySnapshot {
            online_id: online_id.to_string(),
            presence: state,
            platform: platform_info.platform.filter(|p| !p.is_empty()),
            title,
            started_at: platform_info.last_online_date,
        })
    }
}
