mod queue_cache;
mod token;

pub use queue_cache::{DEFAULT_QUEUE_TTL, QueueCache};
pub use token::{REFRESH_MARGIN_SECS, TokenStore};
