use std::{
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::{error::PlaybackError, types::QueueView};

pub const DEFAULT_QUEUE_TTL: Duration = Duration::from_millis(1000);

struct CacheEntry {
    view: QueueView,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheSlot {
    entry: Option<CacheEntry>,
    // bumped by every invalidation so a load that started earlier cannot
    // store its result afterwards
    epoch: u64,
}

/// Short-lived read-through cache for the upcoming-queue view.
///
/// Shared by every operation of a session. Invalidation is last-writer-wins
/// and always safe to repeat.
pub struct QueueCache {
    ttl: Duration,
    slot: Mutex<CacheSlot>,
}

impl Default for QueueCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_TTL)
    }
}

impl QueueCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    /// Returns the cached view while it is younger than the TTL, otherwise
    /// calls `loader`.
    ///
    /// A failing `loader` is answered with the last good view when one exists.
    /// The error only propagates when nothing is cached, or when the session
    /// has no credentials at all.
    pub async fn get<F, Fut>(&self, loader: F) -> Result<QueueView, PlaybackError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueueView, PlaybackError>>,
    {
        let epoch = {
            let slot = self.lock();
            if let Some(entry) = &slot.entry {
                if entry.fetched_at.elapsed() < self.ttl {
                    tracing::trace!(tracks = entry.view.upcoming.len(), "queue cache hit");
                    return Ok(entry.view.clone());
                }
            }
            slot.epoch
        };

        match loader().await {
            Ok(view) => {
                let mut slot = self.lock();
                if slot.epoch == epoch {
                    slot.entry = Some(CacheEntry {
                        view: view.clone(),
                        fetched_at: Instant::now(),
                    });
                }
                Ok(view)
            }
            Err(PlaybackError::Unauthenticated) => Err(PlaybackError::Unauthenticated),
            Err(err) => {
                let slot = self.lock();
                match &slot.entry {
                    Some(entry) => {
                        tracing::warn!(error = %err, "queue read failed, serving cached queue");
                        Ok(entry.view.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Drops the cached view immediately.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.entry = None;
        slot.epoch += 1;
    }

    pub fn is_populated(&self) -> bool {
        self.lock().entry.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
