//! Error types for webhook delivery.

use thiserror::Error;

use crate::transport::HttpError;

/// Failure of a single delivery attempt.
#[derive(Debug, Error)]
pub enum RetryableError {
    /// The request did not complete.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The endpoint answered with a non-2xx status.
    #[error("Webhook returned HTTP {status}")]
    NonSuccessStatus {
        /// Status code returned by the endpoint.
        status: http::StatusCode,
        /// Response body, if it was valid UTF-8.
        body: Option<String>,
    },

    /// The body template could not be rendered.
    #[error("Failed to render body template: {0}")]
    Template(String),
}

/// Final outcome of a failed delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// An attempt failed in a way retrying cannot fix.
    #[error("Webhook delivery failed: {0}")]
    Failed(#[from] RetryableError),

    /// Every attempt failed.
    #[error("Webhook delivery failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last_error: RetryableError,
    },
}
