//! Roster fetching trait and error types.

use super::{ClientRecord, SiteId};
use crate::transport::HttpError;
use thiserror::Error;

/// Missing or rejected credentials.
///
/// Fatal for the current poll cycle only; the next cycle tries again at the
/// normal interval.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No API key is configured.
    #[error("No API key configured")]
    MissingApiKey,

    /// The API key contains characters that cannot be sent in a header.
    #[error("API key is not a valid header value")]
    MalformedApiKey,

    /// The remote API rejected the API key.
    #[error("API key rejected (HTTP {status})")]
    Rejected {
        /// Status code returned by the API.
        status: http::StatusCode,
    },
}

/// Error type for roster fetches.
///
/// The poller treats every variant the same way: the cycle is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Credentials are missing or invalid.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The request did not complete.
    #[error("Request failed: {0}")]
    Http(#[from] HttpError),

    /// The API answered with a non-success status.
    #[error("Unexpected HTTP status {status}")]
    Status {
        /// Status code returned by the API.
        status: http::StatusCode,
        /// Response body, if it was valid UTF-8.
        body: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("Failed to parse client list: {0}")]
    Parse(#[source] serde_json::Error),
}

impl FetchError {
    /// Returns true for credential problems.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Trait for fetching the client roster of one site.
///
/// One call returns the full current roster, not a delta. Record order must
/// be preserved; duplicate keys are resolved by the caller (first wins).
///
/// # Example
///
/// ```ignore
/// use nebula_presence::nebula::{ClientFetcher, ClientRecord, FetchError, SiteId};
///
/// struct StaticFetcher(Vec<ClientRecord>);
///
/// impl ClientFetcher for StaticFetcher {
///     async fn fetch_clients(&self, _site: &SiteId) -> Result<Vec<ClientRecord>, FetchError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait ClientFetcher: Send + Sync + 'static {
    /// Fetches the current roster for `site`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network, authentication or parse failure.
    fn fetch_clients(
        &self,
        site: &SiteId,
    ) -> impl std::future::Future<Output = Result<Vec<ClientRecord>, FetchError>> + Send;
}

impl<T: ClientFetcher> ClientFetcher for std::sync::Arc<T> {
    fn fetch_clients(
        &self,
        site: &SiteId,
    ) -> impl std::future::Future<Output = Result<Vec<ClientRecord>, FetchError>> + Send {
        (**self).fetch_clients(site)
    }
}
