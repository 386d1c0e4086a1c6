use serde_json::json;
use sporlctl::error::PlaybackError;
use sporlctl::session::{SkipConfig, SkipPlan};
use sporlctl::spotify::auth::authorize_url;
use sporlctl::types::{
    PlaybackSnapshot, PlayerResponse, QueueResponse, QueueTrack, QueueView, RepeatMode,
};
use sporlctl::utils::*;

// Helper function to create a queue view from uris
fn create_test_view(uris: &[&str]) -> QueueView {
    QueueView {
        upcoming: uris
            .iter()
            .map(|uri| QueueTrack {
                uri: uri.to_string(),
                name: format!("Name of {}", uri),
                artists: vec!["Artist".to_string()],
                album: Some("Album".to_string()),
            })
            .collect(),
        context_position: None,
    }
}

#[test]
fn test_generate_state() {
    let state = generate_state();

    // Should be exactly 16 characters
    assert_eq!(state.len(), 16);

    // Should contain only alphanumeric characters
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated values should be different
    assert_ne!(state, generate_state());
}

#[test]
fn test_basic_auth_header() {
    // base64("id:secret")
    assert_eq!(basic_auth_header("id", "secret"), "Basic aWQ6c2VjcmV0");
}

#[test]
fn test_format_ms() {
    assert_eq!(format_ms(0), "0:00");
    assert_eq!(format_ms(61_500), "1:01");
    assert_eq!(format_ms(3_600_000), "60:00");
}

#[test]
fn test_queue_rows() {
    let rows = queue_rows(&create_test_view(&["spotify:track:a", "spotify:track:b"]));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].position, 1);
    assert_eq!(rows[1].uri, "spotify:track:b");
    assert_eq!(rows[1].artists, "Artist");
}

#[test]
fn test_skip_plan_counts_the_target_itself() {
    let view = create_test_view(&["a", "b", "c", "d"]);

    let plan = SkipPlan::build(&view, "a").unwrap();
    assert_eq!(plan.target_index, 0);
    assert_eq!(plan.total_skips, 1);

    let plan = SkipPlan::build(&view, "d").unwrap();
    assert_eq!(plan.total_skips, 4);
}

#[test]
fn test_skip_plan_uses_first_exact_match() {
    let view = create_test_view(&["a", "b", "a"]);

    assert_eq!(SkipPlan::build(&view, "a").unwrap().target_index, 0);
    assert!(matches!(
        SkipPlan::build(&view, "A"),
        Err(PlaybackError::TrackNotInQueue { .. })
    ));
    assert!(SkipPlan::build(&QueueView::default(), "a").is_err());
}

#[test]
fn test_effective_batch_size() {
    let config = SkipConfig::default();
    assert_eq!(config.effective_batch_size(), 10);

    let capped = SkipConfig {
        batch_size: 25,
        max_concurrent_requests: 4,
        ..SkipConfig::default()
    };
    assert_eq!(capped.effective_batch_size(), 4);

    let zero = SkipConfig {
        batch_size: 0,
        ..SkipConfig::default()
    };
    assert_eq!(zero.effective_batch_size(), 1);
}

#[test]
fn test_repeat_mode_cycle() {
    assert_eq!(RepeatMode::Off.next(), RepeatMode::Context);
    assert_eq!(RepeatMode::Context.next(), RepeatMode::Track);
    assert_eq!(RepeatMode::Track.next(), RepeatMode::Off);
    assert_eq!(RepeatMode::Context.to_string(), "context");
}

#[test]
fn test_snapshot_from_player_response() {
    let response: PlayerResponse = serde_json::from_value(json!({
        "is_playing": true,
        "progress_ms": 1234,
        "shuffle_state": true,
        "repeat_state": "track",
        "item": {
            "id": "abc",
            "uri": "spotify:track:abc",
            "name": "Song",
            "duration_ms": 200000,
            "artists": [{ "name": "One" }, { "name": "Two" }],
            "album": { "name": "Record" }
        },
        "context": { "uri": "spotify:playlist:p", "type": "playlist" }
    }))
    .unwrap();

    let snapshot = PlaybackSnapshot::from(response);

    assert!(snapshot.is_playing_uri("spotify:track:abc"));
    assert_eq!(snapshot.artists, vec!["One", "Two"]);
    assert_eq!(snapshot.repeat_mode, RepeatMode::Track);
    assert_eq!(snapshot.context_type.as_deref(), Some("playlist"));
    assert!(describe_snapshot(&snapshot).contains("Song - One, Two"));
}

#[test]
fn test_snapshot_without_item() {
    let response: PlayerResponse =
        serde_json::from_value(json!({ "is_playing": false })).unwrap();

    let snapshot = PlaybackSnapshot::from(response);

    assert!(!snapshot.has_item());
    assert_eq!(snapshot.progress_ms, 0);
    assert_eq!(snapshot.repeat_mode, RepeatMode::Off);
}

#[test]
fn test_queue_view_from_response() {
    let response: QueueResponse = serde_json::from_value(json!({
        "currently_playing": null,
        "queue": [
            { "uri": "spotify:track:1", "name": "One", "artists": [{ "name": "A" }] },
            { "uri": "spotify:episode:2", "name": "Two", "show": { "name": "Podcast" } }
        ]
    }))
    .unwrap();

    let view = QueueView::from(response);

    assert_eq!(view.position_of("spotify:episode:2"), Some(1));
    assert_eq!(view.upcoming[1].artists, vec!["Podcast"]);
    assert_eq!(view.context_position, None);
}

#[test]
fn test_authorize_url() {
    let url = authorize_url(
        "https://accounts.spotify.com/authorize",
        "client",
        "http://localhost:8888/callback",
        "user-read-playback-state",
        "state123",
    )
    .unwrap();

    assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("client_id=client"));
    assert!(url.contains("state=state123"));
    assert!(url.contains("show_dialog=true"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"));
}

#[test]
fn test_context_offset() {
    assert_eq!(context_offset(Some(3), 4), Some(8));
    assert_eq!(context_offset(None, 0), Some(1));
    assert_eq!(context_offset(Some(u32::MAX - 1), 0), Some(u32::MAX));
    assert_eq!(context_offset(Some(u32::MAX), 0), None);
    assert_eq!(context_offset(Some(1), u32::MAX as usize), None);
}
