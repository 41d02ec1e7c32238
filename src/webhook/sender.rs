//! HTTP webhook sink with retry support.

use std::time::UNIX_EPOCH;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};

use super::{RetryPolicy, RetryableError, WebhookError};
use crate::events::{EventSink, PresenceEvent};
use crate::time::{Sleeper, TokioSleeper};
use crate::transport::{HttpClient, HttpError, HttpRequest};

/// Delivers presence events to an HTTP endpoint.
///
/// Each event becomes one request. Transient failures are retried with
/// exponential backoff per the [`RetryPolicy`].
///
/// # Body
///
/// Without a template the body is a JSON object with the fields `site`,
/// `client`, `kind` (`"disconnected"` or `"reconnected"`) and `timestamp`
/// (Unix seconds). A Handlebars template sees the same variables.
///
/// # Example
///
/// ```
/// use nebula_presence::transport::ReqwestClient;
/// use nebula_presence::webhook::HttpWebhook;
/// use url::Url;
///
/// let webhook = HttpWebhook::new(
///     ReqwestClient::new(),
///     Url::parse("https://hooks.example.com/presence").unwrap(),
/// )
/// .with_body_template(r#"{"text":"{{client}} at {{site}} {{kind}}"}"#);
/// ```
#[derive(Debug)]
pub struct HttpWebhook<H, S = TokioSleeper> {
    client: H,
    sleeper: S,
    url: url::Url,
    method: http::Method,
    headers: http::HeaderMap,
    body_template: Option<String>,
    retry_policy: RetryPolicy,
}

impl<H> HttpWebhook<H, TokioSleeper> {
    /// Creates a webhook that POSTs the default JSON body.
    #[must_use]
    pub fn new(client: H, url: url::Url) -> Self {
        Self {
            client,
            sleeper: TokioSleeper,
            url,
            method: http::Method::POST,
            headers: http::HeaderMap::new(),
            body_template: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl<H, S> HttpWebhook<H, S> {
    /// Replaces the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper<S2>(self, sleeper: S2) -> HttpWebhook<H, S2> {
        HttpWebhook {
            client: self.client,
            sleeper,
            url: self.url,
            method: self.method,
            headers: self.headers,
            body_template: self.body_template,
            retry_policy: self.retry_policy,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    /// Sets extra request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets a Handlebars body template.
    #[must_use]
    pub fn with_body_template(mut self, template: impl Into<String>) -> Self {
        self.body_template = Some(template.into());
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &url::Url {
        &self.url
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &http::Method {
        &self.method
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// Variables exposed to the body template and used as the default body.
#[derive(Debug, Serialize)]
struct EventData<'a> {
    site: &'a str,
    client: &'a str,
    kind: &'static str,
    timestamp: u64,
}

impl<'a> From<&'a PresenceEvent> for EventData<'a> {
    fn from(event: &'a PresenceEvent) -> Self {
        Self {
            site: event.site.as_str(),
            client: event.observer.as_str(),
            kind: event.kind.as_str(),
            timestamp: event
                .timestamp
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
        }
    }
}

impl<H: HttpClient, S: Sleeper> HttpWebhook<H, S> {
    fn build_request(&self, event: &PresenceEvent) -> Result<HttpRequest, RetryableError> {
        let data = EventData::from(event);
        let mut request = HttpRequest::new(self.method.clone(), self.url.clone());

        request = match &self.body_template {
            Some(template) => {
                let rendered = Handlebars::new()
                    .render_template(template, &data)
                    .map_err(|e| RetryableError::Template(e.to_string()))?;
                request.with_body(rendered.into_bytes())
            }
            None => request.with_json(&data)?,
        };

        // Configured headers replace defaults such as Content-Type.
        for name in self.headers.keys() {
            request.headers.remove(name);
        }
        for (name, value) in &self.headers {
            request.headers.append(name, value.clone());
        }

        Ok(request)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<(), RetryableError> {
        let response = self.client.request(request.clone()).await?;

        if response.is_success() {
            return Ok(());
        }

        Err(RetryableError::NonSuccessStatus {
            status: response.status,
            body: response.body_text().map(ToString::to_string),
        })
    }

    async fn deliver(&self, event: &PresenceEvent) -> Result<(), WebhookError> {
        let request = self.build_request(event)?;

        let mut attempt = 1;
        loop {
            match self.attempt(&request).await {
                Ok(()) => {
                    debug!(client = %event.observer, attempt, "Webhook delivered");
                    return Ok(());
                }
                Err(e) if !e.is_retryable() => return Err(e.into()),
                Err(e) if !self.retry_policy.should_retry(attempt) => {
                    return Err(WebhookError::MaxRetriesExceeded {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.retry_policy.delay_for_retry(attempt - 1);
                    warn!(error = %e, attempt, ?delay, "Webhook attempt failed, retrying");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl<H: HttpClient, S: Sleeper> EventSink for HttpWebhook<H, S> {
    type Error = WebhookError;

    async fn emit(&self, event: &PresenceEvent) -> Result<(), WebhookError> {
        self.deliver(event).await
    }
}

/// Classifies errors as transient or permanent.
pub trait IsRetryable {
    /// Returns true if trying again may succeed.
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for HttpError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::InvalidUrl(_) | Self::Encode(_) => false,
        }
    }
}

impl IsRetryable for RetryableError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_retryable(),
            Self::NonSuccessStatus { status, .. } => {
                status.is_server_error()
                    || *status == http::StatusCode::TOO_MANY_REQUESTS
                    || *status == http::StatusCode::REQUEST_TIMEOUT
            }
            Self::Template(_) => false,
        }
    }
}
