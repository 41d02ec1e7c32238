//! Zyxel Nebula cloud API implementation of [`ClientFetcher`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, ClientFetcher, ClientRecord, FetchError, SiteId};
use crate::transport::{HttpClient, HttpRequest};

/// Default base URL of the Nebula cloud API.
pub const DEFAULT_API_URL: &str = "https://api.nebula.zyxel.com";

/// Default lookback window for the client list.
pub const DEFAULT_PERIOD: &str = "2h";

/// Fields requested for every client in the roster.
pub const REQUESTED_FEATURES: [&str; 2] = ["mac_address", "os_hostname"];

/// Header carrying the API key (header names are case-insensitive).
pub const API_KEY_HEADER: &str = "x-zyxelnebula-api-key";

/// Request body of the site client-list endpoint.
#[derive(Debug, Serialize)]
struct ClientListRequest<'a> {
    period: &'a str,
    features: &'a [&'a str],
}

/// Response envelope of the site client-list endpoint.
#[derive(Debug, Deserialize)]
struct ClientListResponse {
    #[serde(default)]
    data: Option<Vec<ClientEntry>>,
}

/// One roster entry. Either field may be absent or null.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientEntry {
    #[serde(default)]
    mac_address: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl ClientEntry {
    /// Entries without a MAC cannot match any client and are dropped.
    /// A missing status counts as not online.
    fn into_record(self) -> Option<ClientRecord> {
        let mac = self.mac_address?;
        Some(ClientRecord::new(mac, self.status.unwrap_or_default()))
    }
}

/// Fetches site rosters from the Nebula cloud API.
///
/// Issues `POST {api_url}/v2/nebula/{site}/clients` with the lookback
/// period and requested fields, authenticated by the API key header.
///
/// A missing API key is reported per call as [`AuthError::MissingApiKey`]
/// rather than at construction, so polling resumes as soon as a key is
/// supplied to a new fetcher.
#[derive(Debug)]
pub struct NebulaFetcher<H> {
    client: H,
    api_url: url::Url,
    api_key: Option<String>,
    period: String,
}

impl<H> NebulaFetcher<H> {
    /// Creates a fetcher against `api_url`.
    #[must_use]
    pub fn new(client: H, api_url: url::Url, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url,
            api_key,
            period: DEFAULT_PERIOD.to_string(),
        }
    }

    /// Sets the lookback window (e.g. `"2h"`, `"24h"`).
    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = period.into();
        self
    }

    /// Returns the configured lookback window.
    #[must_use]
    pub fn period(&self) -> &str {
        &self.period
    }

    /// Returns the client-list URL for `site`.
    fn clients_url(&self, site: &SiteId) -> Result<url::Url, FetchError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                FetchError::Http(crate::transport::HttpError::InvalidUrl(
                    self.api_url.to_string(),
                ))
            })?
            .pop_if_empty()
            .extend(["v2", "nebula", site.as_str(), "clients"]);
        Ok(url)
    }

    fn build_request(&self, site: &SiteId) -> Result<HttpRequest, FetchError> {
        let api_key = self.api_key.as_deref().ok_or(AuthError::MissingApiKey)?;
        let key_value =
            http::HeaderValue::from_str(api_key).map_err(|_| AuthError::MalformedApiKey)?;

        let body = ClientListRequest {
            period: &self.period,
            features: &REQUESTED_FEATURES,
        };

        Ok(HttpRequest::post(self.clients_url(site)?)
            .with_json(&body)?
            .with_header(http::HeaderName::from_static(API_KEY_HEADER), key_value))
    }
}

impl<H: HttpClient + 'static> ClientFetcher for NebulaFetcher<H> {
    async fn fetch_clients(&self, site: &SiteId) -> Result<Vec<ClientRecord>, FetchError> {
        let request = self.build_request(site)?;
        debug!(%site, period = %self.period, "requesting client list");

        let response = self.client.request(request).await?;

        if response.status == http::StatusCode::UNAUTHORIZED
            || response.status == http::StatusCode::FORBIDDEN
        {
            return Err(AuthError::Rejected {
                status: response.status,
            }
            .into());
        }

        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                body: response.body_text().map(ToString::to_string),
            });
        }

        let parsed: ClientListResponse = response.json().map_err(FetchError::Parse)?;
        let entries = parsed.data.unwrap_or_default();
        let total = entries.len();
        let records: Vec<ClientRecord> =
            entries.into_iter().filter_map(ClientEntry::into_record).collect();
        if records.len() < total {
            debug!(
                %site,
                skipped = total - records.len(),
                "ignoring roster entries without a MAC address"
            );
        }
        debug!(%site, clients = records.len(), "client list received");

        Ok(records)
    }
}
