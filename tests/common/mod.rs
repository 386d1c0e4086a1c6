#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use sporlctl::{
    error::PlaybackError,
    management::{QueueCache, TokenStore},
    session::{
        AuthorizedCaller, PlaybackSession, PlaybackStateReader, QueueReader, SessionOptions,
        SkipConfig, SkipEngine,
    },
    spotify::{ApiRequest, ApiResponse, AuthBackend, Method, Transport, player},
    types::{Credentials, RepeatMode, TokenResponse},
};

pub const INITIAL_TOKEN: &str = "token-0";
pub const INITIAL_REFRESH: &str = "refresh-0";

pub fn track_uri(idx: usize) -> String {
    format!("spotify:track:t{idx:03}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct FakeState {
    valid_tokens: HashSet<String>,
    tracks: Vec<String>,
    current: Option<usize>,
    is_playing: bool,
    progress_ms: u64,
    shuffle_on: bool,
    repeat: RepeatMode,
    context_uri: Option<String>,
    scripted: HashMap<String, VecDeque<StatusCode>>,
    deferred: Vec<(usize, String, StatusCode, usize)>,
    skip_advance: usize,
    perturb_shuffle: bool,
    skips_applied: usize,
    expiries: VecDeque<usize>,
    calls: Vec<Call>,
}

/// In-memory playback service speaking the `/me/player` API.
pub struct FakeSpotify {
    state: Mutex<FakeState>,
}

impl FakeSpotify {
    /// `track_count` tracks, playing the first one, shuffle off.
    pub fn new(track_count: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                valid_tokens: HashSet::from([INITIAL_TOKEN.to_string()]),
                tracks: (0..track_count).map(track_uri).collect(),
                current: Some(0),
                is_playing: true,
                progress_ms: 0,
                shuffle_on: false,
                repeat: RepeatMode::Off,
                context_uri: None,
                scripted: HashMap::new(),
                deferred: Vec::new(),
                skip_advance: 1,
                perturb_shuffle: false,
                skips_applied: 0,
                expiries: VecDeque::new(),
                calls: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn grant(&self, token: &str) {
        self.lock().valid_tokens.insert(token.to_string());
    }

    pub fn revoke_tokens(&self) {
        self.lock().valid_tokens.clear();
    }

    /// Every token stops working once `n` skips in total have been applied.
    pub fn expire_tokens_after_skips(&self, n: usize) {
        self.lock().expiries.push_back(n);
    }

    /// The next `times` calls to `path` answer `status` without side effects.
    pub fn script(&self, path: &str, status: StatusCode, times: usize) {
        let mut state = self.lock();
        let queue = state.scripted.entry(path.to_string()).or_default();
        queue.extend(std::iter::repeat_n(status, times));
    }

    /// Like [`FakeSpotify::script`], armed once `skips` skips have been applied.
    pub fn script_after_skips(&self, skips: usize, path: &str, status: StatusCode, times: usize) {
        self.lock()
            .deferred
            .push((skips, path.to_string(), status, times));
    }

    pub fn set_skip_advance(&self, n: usize) {
        self.lock().skip_advance = n;
    }

    /// Skips and plays switch shuffle off, like the real service sometimes does.
    pub fn perturb_shuffle(&self, on: bool) {
        self.lock().perturb_shuffle = on;
    }

    pub fn set_current(&self, idx: Option<usize>) {
        self.lock().current = idx;
    }

    pub fn set_playing(&self, playing: bool) {
        self.lock().is_playing = playing;
    }

    pub fn set_progress(&self, ms: u64) {
        self.lock().progress_ms = ms;
    }

    pub fn set_shuffle(&self, on: bool) {
        self.lock().shuffle_on = on;
    }

    pub fn set_repeat(&self, mode: RepeatMode) {
        self.lock().repeat = mode;
    }

    pub fn set_context(&self, uri: Option<&str>) {
        self.lock().context_uri = uri.map(str::to_string);
    }

    pub fn clear_tracks(&self) {
        self.lock().tracks.clear();
    }

    pub fn current_uri(&self) -> Option<String> {
        let state = self.lock();
        state.current.map(|idx| state.tracks[idx].clone())
    }

    pub fn shuffle(&self) -> bool {
        self.lock().shuffle_on
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn skip_calls(&self) -> usize {
        self.count(Method::Post, player::NEXT_PATH)
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .cloned()
            .collect()
    }
}

impl FakeState {
    fn state_body(&self, idx: usize) -> Value {
        let uri = &self.tracks[idx];
        let mut body = json!({
            "is_playing": self.is_playing,
            "progress_ms": self.progress_ms,
            "shuffle_state": self.shuffle_on,
            "repeat_state": self.repeat.as_str(),
            "item": track_json(idx, uri),
        });
        if let Some(context) = &self.context_uri {
            body["context"] = json!({ "uri": context, "type": "album" });
        }
        body
    }

    fn queue_body(&self) -> Value {
        let upcoming: Vec<Value> = match self.current {
            Some(idx) => self
                .tracks
                .iter()
                .enumerate()
                .skip(idx + 1)
                .map(|(i, uri)| track_json(i, uri))
                .collect(),
            None => Vec::new(),
        };
        let mut body = json!({ "queue": upcoming });
        if let (Some(_), Some(idx)) = (&self.context_uri, self.current) {
            body["context"] = json!({ "position": idx });
        }
        body
    }

    fn apply_skip(&mut self) {
        if let Some(idx) = self.current {
            let last = self.tracks.len().saturating_sub(1);
            self.current = Some((idx + self.skip_advance).min(last));
            self.progress_ms = 0;
        }
        if self.perturb_shuffle {
            self.shuffle_on = false;
        }
        self.skips_applied += 1;
        if self.expiries.front() == Some(&self.skips_applied) {
            self.expiries.pop_front();
            self.valid_tokens.clear();
        }
        let applied = self.skips_applied;
        let (armed, waiting) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition::<Vec<_>, _>(|(after, ..)| *after == applied);
        self.deferred = waiting;
        for (_, path, status, times) in armed {
            self.scripted
                .entry(path)
                .or_default()
                .extend(std::iter::repeat_n(status, times));
        }
    }

    fn apply_play(&mut self, body: &Value) {
        if let Some(uri) = body["uris"][0].as_str() {
            self.current = self.tracks.iter().position(|t| t == uri);
        } else if let Some(position) = body["offset"]["position"].as_u64() {
            self.current = Some(position as usize);
        }
        self.is_playing = true;
        self.progress_ms = 0;
        if self.perturb_shuffle {
            self.shuffle_on = false;
        }
    }
}

fn track_json(idx: usize, uri: &str) -> Value {
    json!({
        "id": format!("t{idx:03}"),
        "uri": uri,
        "name": format!("Track {idx}"),
        "duration_ms": 180_000,
        "artists": [{ "name": "Artist" }],
        "album": { "name": "Album" },
    })
}

#[async_trait]
impl Transport for FakeSpotify {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: &str,
    ) -> Result<ApiResponse, PlaybackError> {
        let mut state = self.lock();
        state.calls.push(Call {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
        });

        if !state.valid_tokens.contains(access_token) {
            return Ok(ApiResponse::new(StatusCode::UNAUTHORIZED));
        }
        if let Some(status) = state
            .scripted
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
        {
            return Ok(ApiResponse::new(status));
        }

        let no_content = ApiResponse::new(StatusCode::NO_CONTENT);
        let response = match (request.method, request.path.as_str()) {
            (Method::Get, player::STATE_PATH) => match state.current {
                Some(idx) => ApiResponse::with_body(StatusCode::OK, state.state_body(idx)),
                None => no_content,
            },
            (Method::Get, player::QUEUE_PATH) => {
                ApiResponse::with_body(StatusCode::OK, state.queue_body())
            }
            (Method::Post, player::NEXT_PATH) => {
                state.apply_skip();
                no_content
            }
            (Method::Post, player::PREVIOUS_PATH) => {
                state.current = state.current.map(|idx| idx.saturating_sub(1));
                state.progress_ms = 0;
                no_content
            }
            (Method::Put, player::PLAY_PATH) => {
                match &request.body {
                    Some(body) => state.apply_play(body),
                    None => state.is_playing = true,
                }
                no_content
            }
            (Method::Put, player::PAUSE_PATH) => {
                state.is_playing = false;
                no_content
            }
            (Method::Put, player::SEEK_PATH) => {
                state.progress_ms = request
                    .query_value("position_ms")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                no_content
            }
            (Method::Put, player::SHUFFLE_PATH) => {
                state.shuffle_on = request.query_value("state") == Some("true");
                no_content
            }
            (Method::Put, player::REPEAT_PATH) => {
                state.repeat = match request.query_value("state") {
                    Some("context") => RepeatMode::Context,
                    Some("track") => RepeatMode::Track,
                    _ => RepeatMode::Off,
                };
                no_content
            }
            _ => ApiResponse::new(StatusCode::NOT_FOUND),
        };
        Ok(response)
    }
}

/// Accounts service issuing `token-1`, `token-2`, ... on refresh.
pub struct FakeAccounts {
    spotify: Option<Arc<FakeSpotify>>,
    pub refreshes: AtomicUsize,
    pub exchanges: AtomicUsize,
    issued: AtomicUsize,
    delay: Option<Duration>,
    expires_in: u64,
    fail_refresh: AtomicBool,
    grant_valid: AtomicBool,
}

impl FakeAccounts {
    pub fn new(spotify: &Arc<FakeSpotify>) -> Self {
        Self {
            spotify: Some(spotify.clone()),
            refreshes: AtomicUsize::new(0),
            exchanges: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            delay: None,
            expires_in: 3600,
            fail_refresh: AtomicBool::new(false),
            grant_valid: AtomicBool::new(true),
        }
    }

    pub fn detached() -> Self {
        Self {
            spotify: None,
            ..Self::new(&FakeSpotify::new(0))
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_expires_in(mut self, secs: u64) -> Self {
        self.expires_in = secs;
        self
    }

    /// Issued tokens are rejected by the playback service.
    pub fn issue_invalid_tokens(self) -> Self {
        self.grant_valid.store(false, Ordering::SeqCst);
        self
    }

    pub fn fail_refreshes(self) -> Self {
        self.fail_refresh.store(true, Ordering::SeqCst);
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    fn issue(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{n}");
        if self.grant_valid.load(Ordering::SeqCst) {
            if let Some(spotify) = &self.spotify {
                spotify.grant(&token);
            }
        }
        token
    }
}

#[async_trait]
impl AuthBackend for FakeAccounts {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, PlaybackError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == "bad-code" {
            return Err(PlaybackError::AuthExchange {
                status: StatusCode::BAD_REQUEST,
                reason: String::from("invalid_grant"),
            });
        }
        Ok(TokenResponse {
            access_token: self.issue(),
            refresh_token: Some(String::from("refresh-1")),
            expires_in: self.expires_in,
            scope: None,
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, PlaybackError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(PlaybackError::AuthRefresh(String::from("invalid_grant")));
        }
        Ok(TokenResponse {
            access_token: self.issue(),
            refresh_token: None,
            expires_in: self.expires_in,
            scope: None,
        })
    }
}

pub fn initial_credentials() -> Credentials {
    Credentials::new(INITIAL_TOKEN, Some(INITIAL_REFRESH), 3600)
}

/// A logged-in session against `spotify`.
pub async fn session(spotify: &Arc<FakeSpotify>, accounts: Arc<FakeAccounts>) -> PlaybackSession {
    let session = PlaybackSession::new(spotify.clone(), accounts, SessionOptions::default());
    session
        .tokens()
        .set_credentials(initial_credentials())
        .await;
    session
}

pub struct EngineParts {
    pub engine: SkipEngine,
    pub tokens: Arc<TokenStore>,
    pub cache: Arc<QueueCache>,
    pub caller: AuthorizedCaller,
}

/// A logged-in skip engine against `spotify`.
pub async fn engine(
    spotify: &Arc<FakeSpotify>,
    accounts: Arc<FakeAccounts>,
    config: SkipConfig,
) -> EngineParts {
    let cache = Arc::new(QueueCache::default());
    let tokens = Arc::new(TokenStore::new(accounts, cache.clone()));
    tokens.set_credentials(initial_credentials()).await;

    let caller = AuthorizedCaller::new(spotify.clone(), tokens.clone());
    let reader = PlaybackStateReader::new(caller.clone());
    let queue = QueueReader::new(caller.clone(), cache.clone());
    EngineParts {
        engine: SkipEngine::new(caller.clone(), reader, queue, config),
        tokens,
        cache,
        caller,
    }
}
