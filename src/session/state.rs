use std::sync::Arc;

use reqwest::StatusCode;

use crate::{
    error::PlaybackError,
    management::QueueCache,
    session::AuthorizedCaller,
    spotify::player,
    types::{PlaybackSnapshot, PlayerResponse, QueueResponse, QueueView},
};

/// Live reads of the playback state. Never cached.
#[derive(Clone)]
pub struct PlaybackStateReader {
    caller: AuthorizedCaller,
}

impl PlaybackStateReader {
    pub fn new(caller: AuthorizedCaller) -> Self {
        Self { caller }
    }

    /// The current snapshot, or `None` when no device is active.
    pub async fn current(&self) -> Result<Option<PlaybackSnapshot>, PlaybackError> {
        let response = self.caller.execute(&player::get_state()).await?;
        if response.status == StatusCode::NO_CONTENT || response.body.is_none() {
            return Ok(None);
        }
        let state: PlayerResponse = response.json()?;
        Ok(Some(state.into()))
    }
}

/// Queue view reads through the session's [`QueueCache`].
#[derive(Clone)]
pub struct QueueReader {
    caller: AuthorizedCaller,
    cache: Arc<QueueCache>,
}

impl QueueReader {
    pub fn new(caller: AuthorizedCaller, cache: Arc<QueueCache>) -> Self {
        Self { caller, cache }
    }

    pub async fn view(&self) -> Result<QueueView, PlaybackError> {
        let caller = self.caller.clone();
        self.cache
            .get(|| async move {
                let response = caller.execute(&player::get_queue()).await?;
                if response.body.is_none() {
                    return Ok(QueueView::default());
                }
                let queue: QueueResponse = response.json()?;
                Ok(QueueView::from(queue))
            })
            .await
    }

    /// Re-reads the queue, bypassing whatever is cached.
    pub async fn fresh_view(&self) -> Result<QueueView, PlaybackError> {
        self.cache.invalidate();
        self.view().await
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}
