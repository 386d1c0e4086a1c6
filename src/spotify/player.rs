//! Request builders for the `/me/player` endpoints.

use serde_json::json;

use crate::{spotify::transport::ApiRequest, types::RepeatMode};

pub const STATE_PATH: &str = "/me/player";
pub const QUEUE_PATH: &str = "/me/player/queue";
pub const NEXT_PATH: &str = "/me/player/next";
pub const PREVIOUS_PATH: &str = "/me/player/previous";
pub const PLAY_PATH: &str = "/me/player/play";
pub const PAUSE_PATH: &str = "/me/player/pause";
pub const SEEK_PATH: &str = "/me/player/seek";
pub const SHUFFLE_PATH: &str = "/me/player/shuffle";
pub const REPEAT_PATH: &str = "/me/player/repeat";

/// `204 No Content` on this call means there is no active device.
pub fn get_state() -> ApiRequest {
    ApiRequest::get(STATE_PATH)
}

pub fn get_queue() -> ApiRequest {
    ApiRequest::get(QUEUE_PATH)
}

/// The single primitive the skip engine is built on.
pub fn skip_next() -> ApiRequest {
    ApiRequest::post(NEXT_PATH)
}

pub fn skip_previous() -> ApiRequest {
    ApiRequest::post(PREVIOUS_PATH)
}

pub fn resume() -> ApiRequest {
    ApiRequest::put(PLAY_PATH)
}

pub fn pause() -> ApiRequest {
    ApiRequest::put(PAUSE_PATH)
}

pub fn seek(position_ms: u64) -> ApiRequest {
    ApiRequest::put(SEEK_PATH).query("position_ms", position_ms)
}

pub fn play_uri(uri: &str) -> ApiRequest {
    ApiRequest::put(PLAY_PATH).json(json!({ "uris": [uri] }))
}

pub fn play_context_at(context_uri: &str, position: u32) -> ApiRequest {
    ApiRequest::put(PLAY_PATH).json(json!({
        "context_uri": context_uri,
        "offset": { "position": position },
    }))
}

pub fn set_shuffle(state: bool) -> ApiRequest {
    ApiRequest::put(SHUFFLE_PATH).query("state", state)
}

pub fn set_repeat(mode: RepeatMode) -> ApiRequest {
    ApiRequest::put(REPEAT_PATH).query("state", mode.as_str())
}
