use std::{
    future::Future,
    path::PathBuf,
    sync::{
        Arc, Mutex as StdMutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, RwLock, watch},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    error::PlaybackError, management::QueueCache, spotify::AuthBackend, types::Credentials,
};

/// Seconds before expiry at which the automatic refresh fires.
pub const REFRESH_MARGIN_SECS: u64 = 60;

/// Owner of the session credentials.
///
/// Readers always observe either the pre-refresh or the post-refresh
/// credentials as a whole. Refreshes are single-flight: callers that arrive
/// while one is running wait for it and share its outcome.
pub struct TokenStore {
    backend: Arc<dyn AuthBackend>,
    queue_cache: Arc<QueueCache>,
    credentials: RwLock<Option<Credentials>>,
    refresh_gate: Mutex<()>,
    last_refresh: StdMutex<Option<Result<String, PlaybackError>>>,
    generation: AtomicU64,
    deadline: watch::Sender<Option<Instant>>,
    refresher: StdMutex<Option<JoinHandle<()>>>,
    cache_path: Option<PathBuf>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn AuthBackend>, queue_cache: Arc<QueueCache>) -> Self {
        let (deadline, _) = watch::channel(None);
        Self {
            backend,
            queue_cache,
            credentials: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            last_refresh: StdMutex::new(None),
            generation: AtomicU64::new(0),
            deadline,
            refresher: StdMutex::new(None),
            cache_path: None,
        }
    }

    /// Persists credentials to `path` after every change.
    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    /// Replaces the credentials without scheduling a refresh.
    pub async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = Some(credentials);
    }

    pub async fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().await.clone()
    }

    /// The bearer token for the next call.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Unauthenticated`] when no usable token is loaded.
    pub async fn access_token(&self) -> Result<String, PlaybackError> {
        match self.credentials.read().await.as_ref() {
            Some(c) if !c.access_token.is_empty() => Ok(c.access_token.clone()),
            _ => Err(PlaybackError::Unauthenticated),
        }
    }

    pub async fn has_refresh_token(&self) -> bool {
        self.credentials
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.as_deref())
            .is_some_and(|t| !t.is_empty())
    }

    /// When the automatic refresh is due, if one is scheduled.
    pub fn next_refresh_at(&self) -> Option<Instant> {
        *self.deadline.borrow()
    }

    /// Restores credentials from the cache file.
    ///
    /// Returns `false` when there is no cache. Expired cached credentials are
    /// refreshed right away.
    pub async fn load(self: &Arc<Self>) -> Result<bool, PlaybackError> {
        let Some(path) = &self.cache_path else {
            return Ok(false);
        };
        let Ok(content) = async_fs::read_to_string(path).await else {
            return Ok(false);
        };
        let cached: Credentials = serde_json::from_str(&content)?;

        let seconds_left = cached.seconds_left();
        self.set_credentials(cached).await;
        if seconds_left <= REFRESH_MARGIN_SECS {
            self.refresh().await?;
        } else {
            self.schedule_refresh(Duration::from_secs(seconds_left - REFRESH_MARGIN_SECS));
        }
        Ok(true)
    }

    /// Makes the session authenticated.
    ///
    /// With a refresh token at hand this is a refresh. Otherwise `obtain_code`
    /// runs the interactive authorization flow and its code is exchanged.
    pub async fn authenticate<F, Fut>(self: &Arc<Self>, obtain_code: F) -> Result<(), PlaybackError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, PlaybackError>>,
    {
        if self.has_refresh_token().await {
            tracing::info!("refresh token present, refreshing instead of authorizing");
            return self.refresh().await.map(|_| ());
        }

        let code = obtain_code().await?;
        let grant = self.backend.exchange_code(&code).await?;
        let credentials = Credentials::from_grant(grant, None);
        if credentials.refresh_token.is_none() {
            tracing::warn!("token exchange returned no refresh token");
        }
        self.install(credentials).await;
        tracing::info!("authorization code exchanged");
        Ok(())
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Callers arriving while a refresh runs get that refresh's outcome
    /// instead of issuing their own.
    pub async fn refresh(self: &Arc<Self>) -> Result<String, PlaybackError> {
        let seen = self.generation.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            let shared = self
                .last_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(outcome) = shared {
                tracing::debug!("joined an in-flight token refresh");
                return outcome;
            }
        }

        let outcome = self.run_refresh().await;
        *self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Refreshes because `rejected` was answered with 401.
    ///
    /// If the live token already differs, someone refreshed in the meantime
    /// and the live token is returned without another exchange.
    pub async fn refresh_after(self: &Arc<Self>, rejected: &str) -> Result<String, PlaybackError> {
        if let Ok(current) = self.access_token().await {
            if current != rejected {
                return Ok(current);
            }
        }
        self.refresh().await
    }

    async fn run_refresh(self: &Arc<Self>) -> Result<String, PlaybackError> {
        let previous = self
            .credentials()
            .await
            .and_then(|c| c.refresh_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PlaybackError::AuthRefresh(String::from("no refresh token available")))?;

        let grant = self.backend.refresh(&previous).await.map_err(|e| match e {
            PlaybackError::AuthRefresh(_) => e,
            other => PlaybackError::AuthRefresh(other.to_string()),
        })?;

        let credentials = Credentials::from_grant(grant, Some(previous));
        let access_token = credentials.access_token.clone();
        self.install(credentials).await;
        tracing::info!("access token refreshed");
        Ok(access_token)
    }

    async fn install(self: &Arc<Self>, credentials: Credentials) {
        let refresh_in = credentials
            .seconds_left()
            .saturating_sub(REFRESH_MARGIN_SECS);
        self.persist(&credentials).await;
        *self.credentials.write().await = Some(credentials);

        // queue data fetched under the old token may be inconsistent now
        self.queue_cache.invalidate();
        self.schedule_refresh(Duration::from_secs(refresh_in));
    }

    async fn persist(&self, credentials: &Credentials) {
        let Some(path) = &self.cache_path else {
            return;
        };

        let written = async {
            if let Some(parent) = path.parent() {
                async_fs::create_dir_all(parent)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            let json = serde_json::to_string_pretty(credentials).map_err(|e| e.to_string())?;
            async_fs::write(path, json).await.map_err(|e| e.to_string())
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(error = %e, path = %path.display(), "failed to cache credentials");
        }
    }

    fn schedule_refresh(self: &Arc<Self>, after: Duration) {
        self.deadline.send_replace(Some(Instant::now() + after));

        let mut refresher = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if refresher.as_ref().is_none_or(|h| h.is_finished()) {
            *refresher = Some(tokio::spawn(refresh_loop(
                Arc::downgrade(self),
                self.deadline.subscribe(),
            )));
        }
        tracing::debug!(secs = after.as_secs(), "automatic token refresh scheduled");
    }

    /// Stops the automatic refresh. Pending credentials stay readable.
    pub fn shutdown(&self) {
        self.deadline.send_replace(None);
        if let Some(handle) = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for TokenStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn refresh_loop(store: Weak<TokenStore>, mut deadline: watch::Receiver<Option<Instant>>) {
    loop {
        let due = *deadline.borrow_and_update();
        let Some(at) = due else {
            if deadline.changed().await.is_err() {
                return;
            }
            continue;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(at) => {
                let Some(store) = store.upgrade() else {
                    return;
                };
                if let Err(e) = store.refresh().await {
                    tracing::warn!(error = %e, "scheduled token refresh failed");
                    store.deadline.send_replace(None);
                }
            }
            changed = deadline.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
