//! Playback-control session.
//!
//! [`PlaybackSession`] is the facade the CLI (or any other front end) talks
//! to. It owns the token store, the queue cache and every background task it
//! starts, so nothing keeps running after the session is shut down.

mod caller;
mod shuffle;
mod skip;
mod state;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use tokio::{sync::Mutex, task::JoinSet};

pub use caller::AuthorizedCaller;
pub use shuffle::ShuffleCompensator;
pub use skip::{
    BatchOutcome, CancelHandle, CancelSignal, SkipConfig, SkipEngine, SkipMode, SkipPhase,
    SkipPlan, SkipReport,
};
pub use state::{PlaybackStateReader, QueueReader};

use crate::{
    error::PlaybackError,
    management::{DEFAULT_QUEUE_TTL, QueueCache, TokenStore},
    spotify::{AuthBackend, AuthorizationFlow, Transport, player},
    types::{PlaybackSnapshot, QueueView, RepeatMode},
    utils::context_offset,
};

/// `previous` restarts the current track once playback is past this point.
pub const RESTART_THRESHOLD_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub skip: SkipConfig,
    pub queue_ttl: Duration,
    /// Settle delay before checking shuffle after `play_uri`.
    pub play_settle_delay: Duration,
    /// Settle delay before checking shuffle after a skip run.
    pub skip_settle_delay: Duration,
    pub token_cache: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            skip: SkipConfig::default(),
            queue_ttl: DEFAULT_QUEUE_TTL,
            play_settle_delay: Duration::from_millis(300),
            skip_settle_delay: Duration::from_millis(500),
            token_cache: None,
        }
    }
}

/// How [`PlaybackSession::jump_via_context`] reached the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    /// Played the enclosing context at this absolute offset.
    Context { position: u32 },
    /// No context was playing, the track was started on its own.
    Direct,
}

pub struct PlaybackSession {
    tokens: Arc<TokenStore>,
    caller: AuthorizedCaller,
    reader: PlaybackStateReader,
    queue: QueueReader,
    engine: SkipEngine,
    compensator: ShuffleCompensator,
    play_settle_delay: Duration,
    skip_settle_delay: Duration,
    active_skip: StdMutex<Option<CancelHandle>>,
    // held for the whole run, a superseding run waits here for the old one
    skip_run: Mutex<()>,
    background: Mutex<JoinSet<()>>,
}

impl PlaybackSession {
    pub fn new(
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthBackend>,
        options: SessionOptions,
    ) -> Self {
        let queue_cache = Arc::new(QueueCache::new(options.queue_ttl));
        let mut tokens = TokenStore::new(auth, queue_cache.clone());
        if let Some(path) = options.token_cache {
            tokens = tokens.with_cache_path(path);
        }
        let tokens = Arc::new(tokens);

        let caller = AuthorizedCaller::new(transport, tokens.clone());
        let reader = PlaybackStateReader::new(caller.clone());
        let queue = QueueReader::new(caller.clone(), queue_cache);
        let engine = SkipEngine::new(caller.clone(), reader.clone(), queue.clone(), options.skip);
        let compensator = ShuffleCompensator::new(caller.clone(), reader.clone());

        Self {
            tokens,
            caller,
            reader,
            queue,
            engine,
            compensator,
            play_settle_delay: options.play_settle_delay,
            skip_settle_delay: options.skip_settle_delay,
            active_skip: StdMutex::new(None),
            skip_run: Mutex::new(()),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn skip_config(&self) -> &SkipConfig {
        self.engine.config()
    }

    /// Runs the browser authorization flow, or refreshes when a refresh token
    /// is already loaded.
    pub async fn authenticate(&self, flow: &AuthorizationFlow) -> Result<(), PlaybackError> {
        self.tokens.authenticate(|| flow.obtain_code()).await
    }

    /// Restores cached credentials. Returns `false` if there were none.
    pub async fn resume(&self) -> Result<bool, PlaybackError> {
        self.tokens.load().await
    }

    /// `None` when no device is active.
    pub async fn current_state(&self) -> Result<Option<PlaybackSnapshot>, PlaybackError> {
        self.reader.current().await
    }

    pub async fn queue_view(&self) -> Result<QueueView, PlaybackError> {
        self.queue.view().await
    }

    /// Pauses when playing, resumes otherwise. Returns whether playback is
    /// now running.
    pub async fn play_pause(&self) -> Result<bool, PlaybackError> {
        let playing = self
            .reader
            .current()
            .await?
            .is_some_and(|s| s.is_playing);

        if playing {
            self.caller.execute(&player::pause()).await?;
        } else {
            self.caller.execute(&player::resume()).await?;
        }
        Ok(!playing)
    }

    pub async fn next(&self) -> Result<(), PlaybackError> {
        let result = self.caller.execute(&player::skip_next()).await;
        self.queue.invalidate();
        result.map(|_| ())
    }

    /// Restarts the current track when more than three seconds in, otherwise
    /// goes to the previous track.
    pub async fn previous(&self) -> Result<(), PlaybackError> {
        let progress = self
            .reader
            .current()
            .await?
            .map_or(0, |s| s.progress_ms);

        let request = if progress > RESTART_THRESHOLD_MS {
            player::seek(0)
        } else {
            player::skip_previous()
        };
        let result = self.caller.execute(&request).await;
        self.queue.invalidate();
        result.map(|_| ())
    }

    /// Starts `uri` on its own and restores shuffle afterwards.
    pub async fn play_uri(&self, uri: &str) -> Result<(), PlaybackError> {
        self.settle_compensation().await;
        let before = self.reader.current().await?;

        let result = self.caller.execute(&player::play_uri(uri)).await;
        self.queue.invalidate();
        result?;

        self.spawn_compensation(
            ShuffleCompensator::expected(before.as_ref()),
            self.play_settle_delay,
        )
        .await;
        Ok(())
    }

    /// Skips forward until `uri` is playing. Cancels a skip run that is
    /// still in progress and starts once it has wound down.
    pub async fn skip_to_queue_item(&self, uri: &str) -> Result<SkipReport, PlaybackError> {
        let cancel = self.begin_skip();
        let _run = match self.skip_run.try_lock() {
            Ok(run) => run,
            Err(_) => {
                let run = self.skip_run.lock().await;
                // the cancelled run moved playback after its queue read
                self.queue.invalidate();
                run
            }
        };
        self.settle_compensation().await;
        let before = self.reader.current().await?;

        let result = self.engine.skip_to(uri, &cancel).await;
        let mutated = !matches!(
            result,
            Err(PlaybackError::TrackNotInQueue { .. } | PlaybackError::Unauthenticated)
        );
        if mutated {
            self.spawn_compensation(
                ShuffleCompensator::expected(before.as_ref()),
                self.skip_settle_delay,
            )
            .await;
        }

        if let Ok(report) = &result {
            tracing::info!(
                phase = ?SkipPhase::Done,
                mode = ?report.mode,
                skips = report.skips_succeeded,
                early_exit = report.early_exit,
                "skip run finished"
            );
        }
        result
    }

    /// Plays the enclosing context at the target's absolute offset, which
    /// takes one call instead of a run of skips.
    pub async fn jump_via_context(&self, uri: &str) -> Result<Jump, PlaybackError> {
        self.settle_compensation().await;
        let before = self.reader.current().await?;
        let view = self.queue.view().await?;
        let index = view
            .position_of(uri)
            .ok_or_else(|| PlaybackError::TrackNotInQueue {
                uri: uri.to_string(),
            })?;

        let context = before.as_ref().and_then(|s| s.context_uri.clone());
        let (request, jump) = match context {
            Some(context_uri) => {
                let position = context_offset(view.context_position, index).ok_or_else(|| {
                    PlaybackError::TrackNotInQueue {
                        uri: uri.to_string(),
                    }
                })?;
                (
                    player::play_context_at(&context_uri, position),
                    Jump::Context { position },
                )
            }
            None => (player::play_uri(uri), Jump::Direct),
        };

        let result = self.caller.execute(&request).await;
        self.queue.invalidate();
        result?;

        self.spawn_compensation(
            ShuffleCompensator::expected(before.as_ref()),
            self.play_settle_delay,
        )
        .await;
        Ok(jump)
    }

    /// Flips shuffle. Turns it on when no device state is known.
    pub async fn toggle_shuffle(&self) -> Result<bool, PlaybackError> {
        // pending compensation would overwrite the new value
        self.settle_compensation().await;
        let target = !self
            .reader
            .current()
            .await?
            .is_some_and(|s| s.shuffle_on);

        self.caller.execute(&player::set_shuffle(target)).await?;
        Ok(target)
    }

    /// Cycles `off -> context -> track -> off`. Forces `off` when there is
    /// nothing playing and nothing queued.
    pub async fn toggle_repeat(&self) -> Result<RepeatMode, PlaybackError> {
        let (state, view) = tokio::try_join!(self.reader.current(), self.queue.view())?;

        let has_item = state.as_ref().is_some_and(PlaybackSnapshot::has_item);
        let mode = if view.is_empty() && !has_item {
            RepeatMode::Off
        } else {
            state.map(|s| s.repeat_mode).unwrap_or_default().next()
        };

        self.caller.execute(&player::set_repeat(mode)).await?;
        Ok(mode)
    }

    /// Seeks within the current track and returns the state afterwards.
    pub async fn seek(&self, position_ms: i64) -> Result<Option<PlaybackSnapshot>, PlaybackError> {
        let position = position_ms.max(0) as u64;
        self.caller.execute(&player::seek(position)).await?;
        self.reader.current().await
    }

    /// Stops the running skip operation, if any.
    pub fn cancel_skip(&self) {
        if let Some(handle) = self.lock_active_skip().as_ref() {
            handle.cancel();
        }
    }

    /// Waits for every background task the session started.
    pub async fn settle(&self) {
        self.settle_compensation().await;
    }

    /// Aborts background work and stops the automatic token refresh.
    pub async fn shutdown(&self) {
        self.cancel_skip();
        self.background.lock().await.abort_all();
        self.tokens.shutdown();
    }

    fn begin_skip(&self) -> CancelSignal {
        let handle = CancelHandle::new();
        let signal = handle.signal();
        if let Some(previous) = self.lock_active_skip().replace(handle) {
            tracing::debug!("cancelling the previous skip run");
            previous.cancel();
        }
        signal
    }

    fn lock_active_skip(&self) -> std::sync::MutexGuard<'_, Option<CancelHandle>> {
        self.active_skip
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn spawn_compensation(&self, expected: Option<bool>, settle: Duration) {
        let Some(expected) = expected else {
            return;
        };

        let compensator = self.compensator.clone();
        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            tracing::debug!(phase = ?SkipPhase::Compensating, shuffle = expected);
            if let Err(e) = compensator.restore(expected, settle).await {
                tracing::warn!(error = %e, "shuffle compensation failed");
            }
        });
    }

    async fn settle_compensation(&self) {
        let mut background = self.background.lock().await;
        while let Some(joined) = background.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "background task panicked");
                }
            }
        }
    }
}
