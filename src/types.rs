use chrono::Utc;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// The live OAuth credentials of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) at which `access_token` stops being valid.
    pub expires_at: i64,
}

impl Credentials {
    pub fn new(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Utc::now().timestamp() + expires_in as i64,
        }
    }

    /// Builds credentials from a token grant. The accounts service may omit
    /// the refresh token on refresh, in which case `previous_refresh` is kept.
    pub fn from_grant(grant: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(previous_refresh),
            expires_at: Utc::now().timestamp() + grant.expires_in as i64,
        }
    }

    pub fn seconds_left(&self) -> u64 {
        (self.expires_at - Utc::now().timestamp()).max(0) as u64
    }
}

/// Body of `POST /api/token` for both grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    Context,
    Track,
}

impl RepeatMode {
    /// `off -> context -> track -> off`
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Context,
            RepeatMode::Context => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::Context => "context",
            RepeatMode::Track => "track",
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the active device is playing right now. Always read live.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub track_id: Option<String>,
    pub track_uri: Option<String>,
    pub name: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub progress_ms: u64,
    pub is_playing: bool,
    pub shuffle_on: bool,
    pub repeat_mode: RepeatMode,
    pub context_uri: Option<String>,
    pub context_type: Option<String>,
}

impl PlaybackSnapshot {
    pub fn has_item(&self) -> bool {
        self.track_uri.is_some()
    }

    pub fn is_playing_uri(&self, uri: &str) -> bool {
        self.track_uri.as_deref() == Some(uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrack {
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
}

/// Upcoming items in the server's forward order. Index 0 is the very next
/// track after the one currently playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueView {
    pub upcoming: Vec<QueueTrack>,
    pub context_position: Option<u32>,
}

impl QueueView {
    pub fn position_of(&self, uri: &str) -> Option<usize> {
        self.upcoming.iter().position(|t| t.uri == uri)
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub shuffle_state: bool,
    #[serde(default)]
    pub repeat_state: RepeatMode,
    #[serde(default)]
    pub item: Option<PlayableItem>,
    #[serde(default)]
    pub context: Option<PlaybackContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackContext {
    pub uri: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A track or an episode as returned by the player endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayableItem {
    #[serde(default)]
    pub id: Option<String>,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<NamedEntity>,
    #[serde(default)]
    pub album: Option<NamedEntity>,
    #[serde(default)]
    pub show: Option<NamedEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub queue: Vec<PlayableItem>,
    #[serde(default)]
    pub context: Option<QueueContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueContext {
    #[serde(default)]
    pub position: Option<u32>,
}

impl PlayableItem {
    fn artist_names(&self) -> Vec<String> {
        match &self.show {
            Some(show) if self.artists.is_empty() => vec![show.name.clone()],
            _ => self.artists.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

impl From<PlayerResponse> for PlaybackSnapshot {
    fn from(res: PlayerResponse) -> Self {
        let artists = res
            .item
            .as_ref()
            .map(PlayableItem::artist_names)
            .unwrap_or_default();
        let (context_uri, context_type) = match res.context {
            Some(ctx) => (ctx.uri, ctx.kind),
            None => (None, None),
        };

        Self {
            track_id: res.item.as_ref().and_then(|i| i.id.clone()),
            track_uri: res.item.as_ref().map(|i| i.uri.clone()),
            name: res.item.as_ref().map(|i| i.name.clone()),
            artists,
            album: res
                .item
                .as_ref()
                .and_then(|i| i.album.as_ref().map(|a| a.name.clone())),
            duration_ms: res.item.as_ref().map_or(0, |i| i.duration_ms),
            progress_ms: res.progress_ms.unwrap_or(0),
            is_playing: res.is_playing,
            shuffle_on: res.shuffle_state,
            repeat_mode: res.repeat_state,
            context_uri,
            context_type,
        }
    }
}

impl From<QueueResponse> for QueueView {
    fn from(res: QueueResponse) -> Self {
        let upcoming = res
            .queue
            .into_iter()
            .map(|item| QueueTrack {
                artists: item.artist_names(),
                album: item.album.map(|a| a.name),
                uri: item.uri,
                name: item.name,
            })
            .collect();

        Self {
            upcoming,
            context_position: res.context.and_then(|c| c.position),
        }
    }
}

#[derive(Tabled)]
pub struct QueueTableRow {
    #[tabled(rename = "#")]
    pub position: usize,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub uri: String,
}
