//! Configuration management for the playback remote.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. The lookup order is:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in `<data_local_dir>/sporlctl/`
//! 3. Application defaults (for everything except client credentials)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{error::PlaybackError, session::SkipConfig};

const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8888/callback";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_SCOPE: &str =
    "user-read-playback-state user-modify-playback-state user-read-currently-playing";

/// Loads environment variables from `<data_local_dir>/sporlctl/.env`.
///
/// Creates the directory if needed. A missing `.env` file is fine, since all
/// values can also be supplied through the process environment. Variables
/// already present in the environment are never overwritten.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/sporlctl/.env`
/// - macOS: `~/Library/Application Support/sporlctl/.env`
/// - Windows: `%LOCALAPPDATA%/sporlctl/.env`
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Root of everything the application keeps on disk.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporlctl");
    path
}

/// Where the session credentials are cached between CLI invocations.
pub fn token_cache_path() -> PathBuf {
    data_dir().join("cache/token.json")
}

/// Address the redirect receiver binds to (`SERVER_ADDRESS`).
///
/// This must match the host and port of [`spotify_redirect_uri`].
pub fn server_addr() -> String {
    env_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Client ID of the registered Spotify application.
///
/// # Errors
///
/// Fails if `SPOTIFY_API_AUTH_CLIENT_ID` is not set.
pub fn spotify_client_id() -> Result<String, PlaybackError> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Client secret of the registered Spotify application.
///
/// Sent as HTTP Basic credentials to the token endpoint. Keep it out of logs.
///
/// # Errors
///
/// Fails if `SPOTIFY_API_AUTH_CLIENT_SECRET` is not set.
pub fn spotify_client_secret() -> Result<String, PlaybackError> {
    required("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

/// OAuth redirect URI registered in the Spotify dashboard.
pub fn spotify_redirect_uri() -> String {
    env_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

/// Space separated scopes requested during authorization.
pub fn spotify_scope() -> String {
    env_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

/// Base URL of the authorization page (`SPOTIFY_API_AUTH_URL`).
pub fn spotify_apiauth_url() -> String {
    env_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

/// Base URL of the Web API (`SPOTIFY_API_URL`).
pub fn spotify_apiurl() -> String {
    env_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

/// Token exchange and refresh endpoint (`SPOTIFY_API_TOKEN_URL`).
pub fn spotify_apitoken_url() -> String {
    env_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Tracing filter directive for the binary, e.g. `warn` or `sporlctl=debug`.
pub fn log_filter() -> String {
    env::var("SPORLCTL_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| String::from("warn"))
}

/// How long the authorization flow waits for the browser redirect.
pub fn authorization_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Skip engine tuning, starting from the documented defaults.
///
/// Unset or unparsable overrides keep the default value.
pub fn skip_config() -> SkipConfig {
    let mut cfg = SkipConfig::default();
    if let Some(v) = parsed("SPORLCTL_SKIP_BATCH_SIZE") {
        cfg.batch_size = v;
    }
    if let Some(v) = parsed("SPORLCTL_SKIP_MAX_CONCURRENT") {
        cfg.max_concurrent_requests = v;
    }
    if let Some(v) = parsed("SPORLCTL_SKIP_MONITORING_INTERVAL") {
        cfg.monitoring_interval = v;
    }
    if let Some(v) = parsed("SPORLCTL_SKIP_RATE_LIMIT_RETRIES") {
        cfg.max_rate_limit_retries = Some(v);
    }
    cfg
}

fn required(key: &str) -> Result<String, PlaybackError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PlaybackError::Config(format!("{key} must be set")))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
