//! Spotify playback remote control.
//!
//! A playback-control session for the Spotify Web API: OAuth token lifecycle
//! with single-flight refresh, a short-lived queue cache, and a batched skip
//! engine that emulates "jump to queue item N" with the "skip one" primitive
//! while keeping the shuffle flag stable.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the local redirect receiver
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - The [`error::PlaybackError`] taxonomy
//! - `logging` - Tracing subscriber setup for the binary
//! - `management` - Session-scoped state holders (tokens, queue cache)
//! - `server` - Local HTTP server for OAuth redirects
//! - `session` - The playback session, skip engine and shuffle compensation
//! - `spotify` - Spotify accounts and player API access
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sporlctl::{
//!     config,
//!     session::{PlaybackSession, SessionOptions},
//!     spotify::{HttpTransport, SpotifyAccounts},
//! };
//!
//! #[tokio::main]
//! async fn main() -> sporlctl::Res<()> {
//!     config::load_env().await?;
//!     let session = PlaybackSession::new(
//!         Arc::new(HttpTransport::new(&config::spotify_apiurl())),
//!         Arc::new(SpotifyAccounts::from_env()?),
//!         SessionOptions::default(),
//!     );
//!     session.resume().await?;
//!     session.skip_to_queue_item("spotify:track:4uLU6hMCjMI75M1A2tKUQC").await?;
//!     session.settle().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod server;
pub mod session;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for the command layer.
///
/// Library operations return [`error::PlaybackError`]. The command layer
/// boxes them so `?` works across configuration and session calls.
///
/// # Example
///
/// ```
/// use sporlctl::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Opening the authorization page...");
/// info!("{} tracks queued", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Reached {} after {} skips", name, skips);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// error!("Playback command failed: {}", err);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("No active device");
/// warning!("Stopped {} skips short of the target", remaining);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
