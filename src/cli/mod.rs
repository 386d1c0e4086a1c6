//! # CLI Module
//!
//! Command implementations for `sporlctl`. Every command builds a
//! [`PlaybackSession`] from the environment, restores the cached credentials,
//! runs one session operation and waits for the session's background work
//! (shuffle compensation) before the process exits.
//!
//! ## Commands
//!
//! - [`auth`] - Browser authorization flow, or refresh of cached credentials
//! - [`status`] - What is playing right now
//! - [`queue`] - The upcoming queue as a table
//! - [`play_pause`], [`next`], [`previous`], [`play`], [`shuffle`],
//!   [`repeat`], [`seek`] - Direct player controls
//! - [`skip_to`] - Jump to an upcoming track, via skips or via the context
//!
//! Failures are reported with the coloured output macros. Fatal ones exit
//! the process with status 1.

mod auth;
mod player;
mod queue;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

pub use auth::auth;
pub use player::{next, play, play_pause, previous, repeat, seek, shuffle, status};
pub use queue::{queue, skip_to};

use crate::{
    Res, config, error,
    session::{PlaybackSession, SessionOptions},
    spotify::{HttpTransport, SpotifyAccounts},
};

fn build_session(accounts: SpotifyAccounts) -> PlaybackSession {
    let options = SessionOptions {
        skip: config::skip_config(),
        token_cache: Some(config::token_cache_path()),
        ..SessionOptions::default()
    };

    PlaybackSession::new(
        Arc::new(HttpTransport::new(&config::spotify_apiurl())),
        Arc::new(accounts),
        options,
    )
}

fn accounts() -> SpotifyAccounts {
    match SpotifyAccounts::from_env() {
        Ok(accounts) => accounts,
        Err(e) => error!("{}", e),
    }
}

/// Builds a session and loads the cached credentials into it. `None` when
/// nothing is cached.
async fn restore() -> Res<Option<PlaybackSession>> {
    let session = build_session(SpotifyAccounts::from_env()?);
    let resumed = session.resume().await?;
    Ok(resumed.then_some(session))
}

/// A session with restored credentials. Exits when there are none.
async fn connect() -> PlaybackSession {
    match restore().await {
        Ok(Some(session)) => session,
        Ok(None) => error!("Not authenticated. Run `sporlctl auth` first."),
        Err(e) => error!("Cannot restore session: {}", e),
    }
}

async fn finish(session: PlaybackSession) {
    session.settle().await;
    session.shutdown().await;
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
