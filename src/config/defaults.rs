//! Default values for configuration options.

use std::time::Duration;

pub use crate::nebula::{DEFAULT_API_URL as API_URL, DEFAULT_PERIOD as PERIOD};

/// Default HTTP method for webhook requests.
pub const METHOD: &str = "POST";

/// Default polling interval in seconds.
pub const POLL_INTERVAL_SECS: u64 = 30;

/// Default maximum number of webhook delivery attempts.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default initial retry delay in seconds.
pub const RETRY_INITIAL_DELAY_SECS: u64 = 5;

/// Default maximum retry delay in seconds.
pub const RETRY_MAX_DELAY_SECS: u64 = 60;

/// Default retry backoff multiplier.
pub const RETRY_MULTIPLIER: f64 = 2.0;

/// Timeout for a single HTTP request, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default config file name written by `init`.
pub const CONFIG_FILE: &str = "nebula-presence.toml";

/// Default polling interval as Duration.
#[must_use]
pub const fn poll_interval() -> Duration {
    Duration::from_secs(POLL_INTERVAL_SECS)
}

/// Timeout for a single HTTP request as Duration.
#[must_use]
pub const fn request_timeout() -> Duration {
    Duration::from_secs(REQUEST_TIMEOUT_SECS)
}
