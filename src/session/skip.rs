//! Jump to an arbitrary queue position using only "skip forward one".
//!
//! A run plans once against the queue view, then issues skips in concurrent
//! batches. Batches run strictly one after another; inside a batch all calls
//! fan out and the fan-in is the barrier for the next decision:
//!
//! ```text
//! Planning ─► BatchExecuting ⇄ {Backoff, Retrying} ─► EarlyExit | PlanExhausted
//!    │              │
//!    │              └─ 401 ─► refresh once ─► Planning (old plan discarded)
//!    └─ target missing ─► Failed(TrackNotInQueue), nothing sent
//! ```
//!
//! Any error outside that classification drops the run into a conservative
//! sequential mode that re-plans and skips one call at a time.

use std::{collections::BTreeSet, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::StatusCode;
use tokio::sync::watch;

use crate::{
    error::PlaybackError,
    session::{AuthorizedCaller, PlaybackStateReader, QueueReader},
    spotify::player,
    types::QueueView,
};

/// Tuning of the skip engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipConfig {
    /// Skips per batch. Capped by `max_concurrent_requests`.
    pub batch_size: usize,
    pub max_concurrent_requests: usize,
    /// Completed skips between early-exit checks. `0` disables the checks.
    pub monitoring_interval: usize,
    /// Pause before each early-exit check, letting the service catch up.
    pub adaptive_throttle: Duration,
    pub rate_limit_backoff: Duration,
    /// `None` waits out rate limiting indefinitely.
    pub max_rate_limit_retries: Option<u32>,
    pub max_retry_rounds: u32,
    /// Round `n` of transient retries waits `n * retry_step`.
    pub retry_step: Duration,
    pub fallback_delay: Duration,
    /// Read the current track once a plan is exhausted and report whether
    /// the target is playing.
    pub verify_target: bool,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_requests: 10,
            monitoring_interval: 15,
            adaptive_throttle: Duration::from_millis(50),
            rate_limit_backoff: Duration::from_millis(1000),
            max_rate_limit_retries: None,
            max_retry_rounds: 3,
            retry_step: Duration::from_millis(200),
            fallback_delay: Duration::from_millis(300),
            verify_target: true,
        }
    }
}

impl SkipConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.min(self.max_concurrent_requests).max(1)
    }
}

/// Immutable once execution starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipPlan {
    pub target_uri: String,
    /// 0-based position of the target in the upcoming queue.
    pub target_index: usize,
    pub total_skips: usize,
}

impl SkipPlan {
    /// Locates `target_uri` by exact match.
    pub fn build(view: &QueueView, target_uri: &str) -> Result<Self, PlaybackError> {
        let target_index =
            view.position_of(target_uri)
                .ok_or_else(|| PlaybackError::TrackNotInQueue {
                    uri: target_uri.to_string(),
                })?;

        Ok(Self {
            target_uri: target_uri.to_string(),
            target_index,
            total_skips: target_index + 1,
        })
    }
}

/// Tally of one fan-out round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: BTreeSet<usize>,
    pub auth_failure_seen: bool,
    pub rate_limited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPhase {
    Planning,
    BatchExecuting,
    Backoff,
    Retrying,
    EarlyExit,
    PlanExhausted,
    Compensating,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipMode {
    Batched,
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReport {
    /// The plan in force when the run ended.
    pub plan: SkipPlan,
    pub mode: SkipMode,
    pub skips_succeeded: usize,
    /// Skips still failing after every retry round.
    pub skips_abandoned: usize,
    pub early_exit: bool,
    pub cancelled: bool,
    pub auth_restarts: u32,
    /// Whether the target was playing at the end. `None` if not checked.
    pub reached_target: Option<bool>,
}

impl SkipReport {
    fn new(plan: SkipPlan, mode: SkipMode) -> Self {
        Self {
            plan,
            mode,
            skips_succeeded: 0,
            skips_abandoned: 0,
            early_exit: false,
            cancelled: false,
            auth_restarts: 0,
            reached_target: None,
        }
    }
}

/// Aborts an in-flight skip run.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleeps for `duration`. Returns `false` if cancelled before or during.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let mut rx = self.rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = async move {
                let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                if closed {
                    std::future::pending::<()>().await;
                }
            } => false,
        }
    }
}

enum BatchResult {
    Completed { succeeded: usize, abandoned: usize },
    AuthFailed { token: String, succeeded: usize },
    Cancelled { succeeded: usize },
}

pub struct SkipEngine {
    caller: AuthorizedCaller,
    reader: PlaybackStateReader,
    queue: QueueReader,
    config: SkipConfig,
}

impl SkipEngine {
    pub fn new(
        caller: AuthorizedCaller,
        reader: PlaybackStateReader,
        queue: QueueReader,
        config: SkipConfig,
    ) -> Self {
        Self {
            caller,
            reader,
            queue,
            config,
        }
    }

    pub fn config(&self) -> &SkipConfig {
        &self.config
    }

    pub async fn plan(&self, target_uri: &str) -> Result<SkipPlan, PlaybackError> {
        tracing::debug!(phase = ?SkipPhase::Planning, target = target_uri);
        let view = self.queue.view().await?;
        SkipPlan::build(&view, target_uri)
    }

    /// Advances playback until `target_uri` is the current track.
    ///
    /// Fails with [`PlaybackError::TrackNotInQueue`] before sending anything
    /// if the target is not upcoming. The queue cache is invalidated once
    /// skipping has started, however the run ends.
    pub async fn skip_to(
        &self,
        target_uri: &str,
        cancel: &CancelSignal,
    ) -> Result<SkipReport, PlaybackError> {
        let plan = self.plan(target_uri).await?;
        tracing::info!(
            target = target_uri,
            index = plan.target_index,
            skips = plan.total_skips,
            "skip plan ready"
        );

        let outcome = match self.run_batched(plan, cancel).await {
            Ok(report) => Ok(report),
            Err(e) if !falls_back(&e) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "batched skipping failed, falling back to sequential mode");
                self.run_sequential(target_uri, cancel).await
            }
        };

        self.queue.invalidate();
        if let Err(e) = &outcome {
            tracing::warn!(phase = ?SkipPhase::Failed, error = %e, "skip run failed");
        }
        outcome
    }

    async fn run_batched(
        &self,
        mut plan: SkipPlan,
        cancel: &CancelSignal,
    ) -> Result<SkipReport, PlaybackError> {
        let batch_size = self.config.effective_batch_size();
        let interval = self.config.monitoring_interval;
        let mut report = SkipReport::new(plan.clone(), SkipMode::Batched);
        let mut rate_limit_retries = 0u32;

        'operation: loop {
            let mut completed = 0usize;
            let mut next_check = interval;

            while completed < plan.total_skips {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'operation;
                }

                let count = batch_size.min(plan.total_skips - completed);
                tracing::debug!(
                    phase = ?SkipPhase::BatchExecuting,
                    batch_start = completed,
                    count,
                    "issuing skip batch"
                );

                match self
                    .execute_batch(count, &mut rate_limit_retries, cancel)
                    .await?
                {
                    BatchResult::Completed {
                        succeeded,
                        abandoned,
                    } => {
                        completed += count;
                        report.skips_succeeded += succeeded;
                        report.skips_abandoned += abandoned;
                    }
                    BatchResult::Cancelled { succeeded } => {
                        report.skips_succeeded += succeeded;
                        report.cancelled = true;
                        break 'operation;
                    }
                    BatchResult::AuthFailed { token, succeeded } => {
                        report.skips_succeeded += succeeded;
                        if report.auth_restarts > 0 {
                            return Err(PlaybackError::AuthRefresh(String::from(
                                "skip requests rejected again after token refresh",
                            )));
                        }
                        report.auth_restarts += 1;
                        tracing::info!("skip batch unauthorized, refreshing and planning again");
                        self.caller.tokens().refresh_after(&token).await?;

                        if let Ok(Some(now)) = self.reader.current().await {
                            if now.is_playing_uri(&plan.target_uri) {
                                report.early_exit = true;
                                report.reached_target = Some(true);
                                break 'operation;
                            }
                        }

                        let view = self.queue.fresh_view().await?;
                        plan = SkipPlan::build(&view, &plan.target_uri)?;
                        report.plan = plan.clone();
                        continue 'operation;
                    }
                }

                // checks fire when `completed` crosses a multiple of the
                // interval, so a batch size that never lands on one exactly
                // still gets checked (10 + 10 crosses 15 at 20)
                if interval > 0 && completed < plan.total_skips && completed >= next_check {
                    next_check = (completed / interval + 1) * interval;
                    if self.target_playing(&plan.target_uri, cancel).await {
                        tracing::info!(
                            phase = ?SkipPhase::EarlyExit,
                            completed,
                            "target reached before the plan ran out"
                        );
                        report.early_exit = true;
                        report.reached_target = Some(true);
                        break 'operation;
                    }
                }
            }

            tracing::debug!(phase = ?SkipPhase::PlanExhausted, completed);
            break;
        }

        if !report.cancelled && !report.early_exit {
            self.verify(&mut report, cancel).await;
        }
        Ok(report)
    }

    /// Issues `count` skips concurrently with rate-limit and retry handling.
    async fn execute_batch(
        &self,
        count: usize,
        rate_limit_retries: &mut u32,
        cancel: &CancelSignal,
    ) -> Result<BatchResult, PlaybackError> {
        let mut pending = count;
        let mut succeeded = 0usize;

        loop {
            let token = self.caller.tokens().access_token().await?;
            let indices: Vec<usize> = (0..pending).collect();
            let outcome = self.fan_out(&indices, &token).await;
            succeeded += outcome.succeeded;

            if outcome.auth_failure_seen {
                return Ok(BatchResult::AuthFailed { token, succeeded });
            }

            if outcome.rate_limited {
                if let Some(max) = self.config.max_rate_limit_retries {
                    if *rate_limit_retries >= max {
                        return Err(PlaybackError::RateLimited);
                    }
                }
                *rate_limit_retries += 1;
                // calls that went through did advance playback
                pending -= outcome.succeeded;
                tracing::info!(
                    phase = ?SkipPhase::Backoff,
                    reissue = pending,
                    "skip batch rate limited, backing off"
                );
                if !cancel.sleep(self.config.rate_limit_backoff).await {
                    return Ok(BatchResult::Cancelled { succeeded });
                }
                continue;
            }

            let mut failed = outcome.failed;
            let mut attempt = 0u32;
            while !failed.is_empty() && attempt < self.config.max_retry_rounds {
                attempt += 1;
                tracing::debug!(
                    phase = ?SkipPhase::Retrying,
                    attempt,
                    failed = failed.len(),
                    "retrying failed skips"
                );
                if !cancel.sleep(self.config.retry_step * attempt).await {
                    return Ok(BatchResult::Cancelled { succeeded });
                }

                let token = self.caller.tokens().access_token().await?;
                let indices: Vec<usize> = failed.iter().copied().collect();
                let retry = self.fan_out(&indices, &token).await;
                succeeded += retry.succeeded;
                if retry.auth_failure_seen {
                    return Ok(BatchResult::AuthFailed { token, succeeded });
                }
                failed = retry.failed;
            }

            if !failed.is_empty() {
                tracing::warn!(
                    abandoned = failed.len(),
                    "skips still failing after retries, continuing best-effort"
                );
            }
            return Ok(BatchResult::Completed {
                succeeded,
                abandoned: failed.len(),
            });
        }
    }

    /// One skip per index, all in flight at once. Stops waiting on the first 401.
    async fn fan_out(&self, indices: &[usize], token: &str) -> BatchOutcome {
        let request = player::skip_next();
        let request = &request;
        let mut in_flight: FuturesUnordered<_> = indices
            .iter()
            .map(|&idx| async move { (idx, self.caller.send_once(request, token).await) })
            .collect();

        let mut outcome = BatchOutcome::default();
        while let Some((idx, result)) = in_flight.next().await {
            match result {
                Ok(res) if res.is_success() => outcome.succeeded += 1,
                Ok(res) if res.status == StatusCode::UNAUTHORIZED => {
                    outcome.auth_failure_seen = true;
                    outcome.failed.insert(idx);
                    break;
                }
                Ok(res) if res.status == StatusCode::TOO_MANY_REQUESTS => {
                    outcome.rate_limited = true;
                    outcome.failed.insert(idx);
                }
                Ok(res) => {
                    tracing::debug!(status = %res.status, "skip call failed");
                    outcome.failed.insert(idx);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "skip call failed");
                    outcome.failed.insert(idx);
                }
            }
        }
        outcome
    }

    async fn run_sequential(
        &self,
        target_uri: &str,
        cancel: &CancelSignal,
    ) -> Result<SkipReport, PlaybackError> {
        let view = self.queue.fresh_view().await?;
        let plan = SkipPlan::build(&view, target_uri)?;
        let mut report = SkipReport::new(plan.clone(), SkipMode::Sequential);
        let request = player::skip_next();

        for i in 0..plan.total_skips {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.caller.execute(&request).await {
                Ok(_) => report.skips_succeeded += 1,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    tracing::warn!(skip = i + 1, error = %e, "sequential skip failed");
                    report.skips_abandoned += 1;
                }
            }

            if i + 1 < plan.total_skips && !cancel.sleep(self.config.fallback_delay).await {
                report.cancelled = true;
                break;
            }
        }

        if !report.cancelled {
            self.verify(&mut report, cancel).await;
        }
        Ok(report)
    }

    async fn target_playing(&self, target_uri: &str, cancel: &CancelSignal) -> bool {
        if !cancel.sleep(self.config.adaptive_throttle).await {
            return false;
        }
        match self.reader.current().await {
            Ok(Some(now)) => now.is_playing_uri(target_uri),
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(error = %e, "monitoring check failed, continuing");
                false
            }
        }
    }

    async fn verify(&self, report: &mut SkipReport, cancel: &CancelSignal) {
        if !self.config.verify_target || !cancel.sleep(self.config.adaptive_throttle).await {
            return;
        }

        report.reached_target = match self.reader.current().await {
            Ok(now) => Some(
                now.is_some_and(|s| s.is_playing_uri(&report.plan.target_uri)),
            ),
            Err(e) => {
                tracing::debug!(error = %e, "could not verify final position");
                None
            }
        };

        if report.reached_target == Some(false) {
            tracing::warn!(
                target = %report.plan.target_uri,
                "plan exhausted but the target is not playing, the queue may have changed"
            );
        }
    }
}

/// Errors the sequential mode cannot do better on.
fn falls_back(err: &PlaybackError) -> bool {
    !matches!(
        err,
        PlaybackError::Unauthenticated
            | PlaybackError::AuthRefresh(_)
            | PlaybackError::TrackNotInQueue { .. }
    )
}
