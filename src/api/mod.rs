//! # API Module
//!
//! HTTP handlers served by the transient redirect receiver during the
//! authorization flow.
//!
//! ## Endpoints
//!
//! - [`callback`] - Accepts the single OAuth redirect, checks the `state`
//!   parameter and hands the authorization code (or the consent error) to the
//!   waiting flow.
//! - [`health`] - Returns status and version, handy for checking that the
//!   receiver is listening on the configured port.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use sporlctl::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
