//! Error type for HTTP transport operations.

use thiserror::Error;

/// Error type for HTTP operations.
///
/// Describes what went wrong at the transport level. Non-2xx responses are
/// not errors here; callers inspect [`super::HttpResponse::status`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed (DNS, refused connection, TLS, reset).
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server did not respond in time.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be built from the given URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}
