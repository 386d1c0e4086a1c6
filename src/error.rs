//! Error taxonomy shared by every playback operation.

use reqwest::StatusCode;

/// Failure of a playback-session operation.
///
/// "No active device" is not represented here: reads report it as `None`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybackError {
    /// No credentials are loaded. Run the authorization flow first.
    #[error("not authenticated, run `sporlctl auth` first")]
    Unauthenticated,

    #[error("authorization code exchange failed ({status}): {reason}")]
    AuthExchange { status: StatusCode, reason: String },

    /// The refresh grant failed, no refresh token exists, or a request was
    /// still rejected after a fresh token. The session should re-authorize.
    #[error("token refresh failed: {0}")]
    AuthRefresh(String),

    #[error("remote call failed with status {status}")]
    RemoteCall { status: StatusCode },

    #[error("rate limited by the remote service")]
    RateLimited,

    /// Raised while planning, before any remote mutation.
    #[error("track {uri} is not in the upcoming queue")]
    TrackNotInQueue { uri: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The local redirect receiver failed, timed out, or consent was denied.
    #[error("authorization flow failed: {0}")]
    Authorization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Errors after which retrying with the same credentials is pointless.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            PlaybackError::Unauthenticated | PlaybackError::AuthRefresh(_)
        )
    }
}

impl From<reqwest::Error> for PlaybackError {
    fn from(err: reqwest::Error) -> Self {
        PlaybackError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PlaybackError {
    fn from(err: serde_json::Error) -> Self {
        PlaybackError::Decode(err.to_string())
    }
}
