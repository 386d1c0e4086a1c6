use std::time::Duration;

use crate::{
    error::PlaybackError,
    session::{AuthorizedCaller, PlaybackStateReader},
    spotify::player,
    types::PlaybackSnapshot,
};

/// Puts the shuffle flag back after operations that perturb it.
///
/// The remote service may flip shuffle on its own when playback jumps. The
/// compensator waits for the state to settle, reads it once and writes the
/// pre-operation value back if it changed.
#[derive(Clone)]
pub struct ShuffleCompensator {
    caller: AuthorizedCaller,
    reader: PlaybackStateReader,
}

impl ShuffleCompensator {
    pub fn new(caller: AuthorizedCaller, reader: PlaybackStateReader) -> Self {
        Self { caller, reader }
    }

    /// The shuffle value to restore later. `None` without an active device.
    pub fn expected(before: Option<&PlaybackSnapshot>) -> Option<bool> {
        before.map(|s| s.shuffle_on)
    }

    /// Waits `settle`, then restores `expected` if the live value differs.
    ///
    /// Returns whether a correction was written. At most one write is issued.
    pub async fn restore(&self, expected: bool, settle: Duration) -> Result<bool, PlaybackError> {
        tokio::time::sleep(settle).await;

        let Some(now) = self.reader.current().await? else {
            tracing::debug!("no active device after settle, skipping shuffle check");
            return Ok(false);
        };
        if now.shuffle_on == expected {
            return Ok(false);
        }

        tracing::info!(shuffle = expected, "shuffle changed remotely, restoring");
        self.caller.execute(&player::set_shuffle(expected)).await?;
        Ok(true)
    }
}
