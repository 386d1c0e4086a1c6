use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{Rng, distr::Alphanumeric};

use crate::types::{PlaybackSnapshot, QueueTableRow, QueueView};

/// Random value for the `state` parameter of the authorization request.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// `Authorization` header value for HTTP Basic client credentials.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Absolute context offset of the upcoming queue entry at `index`. `None`
/// when it does not fit the API's offset type.
pub fn context_offset(context_position: Option<u32>, index: usize) -> Option<u32> {
    u32::try_from(index)
        .ok()?
        .checked_add(context_position.unwrap_or(0))?
        .checked_add(1)
}

/// Formats milliseconds as `m:ss`.
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

pub fn queue_rows(view: &QueueView) -> Vec<QueueTableRow> {
    view.upcoming
        .iter()
        .enumerate()
        .map(|(idx, track)| QueueTableRow {
            position: idx + 1,
            name: track.name.clone(),
            artists: track.artists.join(", "),
            album: track.album.clone().unwrap_or_default(),
            uri: track.uri.clone(),
        })
        .collect()
}

pub fn describe_snapshot(snapshot: &PlaybackSnapshot) -> String {
    let title = snapshot.name.as_deref().unwrap_or("(nothing)");
    let artists = if snapshot.artists.is_empty() {
        String::from("unknown artist")
    } else {
        snapshot.artists.join(", ")
    };

    format!(
        "{} {} - {} [{}/{}] shuffle:{} repeat:{}",
        if snapshot.is_playing { "▶" } else { "⏸" },
        title,
        artists,
        format_ms(snapshot.progress_ms),
        format_ms(snapshot.duration_ms),
        if snapshot.shuffle_on { "on" } else { "off" },
        snapshot.repeat_mode,
    )
}
