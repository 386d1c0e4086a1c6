//! # Spotify Integration Module
//!
//! Everything that talks to Spotify over HTTP lives here. The rest of the
//! crate only sees two seams:
//!
//! ```text
//! Session layer (AuthorizedCaller, SkipEngine, ...)
//!          ↓
//!   ├── Transport    -> Web API calls with a bearer token
//!   └── AuthBackend  -> accounts service (code exchange, refresh grant)
//!          ↓
//! HTTP layer (reqwest, JSON)
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - Accounts service client, authorization URL and the browser
//!   driven authorization code flow.
//! - [`player`] - Request builders for the `/me/player` endpoints.
//! - [`transport`] - The [`Transport`] trait and its reqwest implementation.
//!
//! ## API Coverage
//!
//! - `GET /me/player` - playback state (`204` = no active device)
//! - `GET /me/player/queue` - upcoming items
//! - `POST /me/player/next`, `POST /me/player/previous`
//! - `PUT /me/player/play`, `PUT /me/player/pause` (optionally with `uris`
//!   or `context_uri` + `offset`)
//! - `PUT /me/player/seek`, `PUT /me/player/shuffle`, `PUT /me/player/repeat`
//! - `POST /api/token` - `authorization_code` and `refresh_token` grants
//!
//! Transports never interpret statuses. Retry-on-401, rate limits and
//! tolerated statuses are policy of the session layer.

pub mod auth;
pub mod player;
pub mod transport;

pub use auth::{AuthBackend, AuthorizationFlow, SpotifyAccounts};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
