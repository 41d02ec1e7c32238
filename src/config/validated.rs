//! Validated configuration after merging CLI and TOML sources.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use handlebars::Template;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

use crate::nebula::{ObserverId, SiteId};
use crate::webhook::RetryPolicy;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// One monitored client: a MAC address at a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientTarget {
    /// Site the client belongs to
    pub site: SiteId,
    /// Client key (MAC address)
    pub client: ObserverId,
}

impl ClientTarget {
    /// Parses a `SITE/MAC` argument.
    ///
    /// The site is everything before the first `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidClient`] if the separator is missing or
    /// either side is blank.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let (site, client) = value
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidClient {
                value: value.to_string(),
                reason: "expected SITE/MAC",
            })?;
        Self::new(site, client).map_err(|reason| ConfigError::InvalidClient {
            value: value.to_string(),
            reason,
        })
    }

    fn new(site: &str, client: &str) -> Result<Self, &'static str> {
        let site = SiteId::new(site.trim());
        let client = ObserverId::new(client.trim());
        if site.is_blank() {
            return Err("site must not be empty");
        }
        if client.is_blank() {
            return Err("MAC address must not be empty");
        }
        Ok(Self { site, client })
    }
}

impl fmt::Display for ClientTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site, self.client)
    }
}

/// Webhook delivery settings.
#[derive(Debug)]
pub struct WebhookConfig {
    /// Endpoint URL
    pub url: Url,

    /// HTTP method
    pub method: Method,

    /// Extra request headers
    pub headers: HeaderMap,

    /// Handlebars body template
    pub body_template: Option<String>,
}

/// Fully validated configuration.
///
/// Use [`ValidatedConfig::from_raw`] to build one from CLI args and an
/// optional TOML file. Priority is CLI, then TOML, then defaults.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Nebula API key. Missing keys are reported by every poll cycle.
    pub api_key: Option<String>,

    /// Base URL of the Nebula API
    pub api_url: Url,

    /// Lookback period for the client list
    pub period: String,

    /// Polling interval
    pub poll_interval: Duration,

    /// Monitored clients, without duplicates, in configuration order
    pub clients: Vec<ClientTarget>,

    /// Webhook settings; `None` logs events only
    pub webhook: Option<WebhookConfig>,

    /// Retry policy for failed webhook requests
    pub retry_policy: RetryPolicy,

    /// Log events without sending webhooks
    pub dry_run: bool,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let webhook = self
            .webhook
            .as_ref()
            .map_or_else(|| "none".to_string(), |w| format!("{} {}", w.method, w.url));

        write!(
            f,
            "Config {{ api_url: {}, api_key: {}, period: {}, poll_interval: {}s, clients: {}, \
             webhook: {}, retry: {}x/{}s, dry_run: {} }}",
            self.api_url,
            if self.api_key.is_some() { "set" } else { "missing" },
            self.period,
            self.poll_interval.as_secs(),
            self.clients.len(),
            webhook,
            self.retry_policy.max_attempts,
            self.retry_policy.initial_delay.as_secs(),
            self.dry_run,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No client is configured, or a client entry is malformed
    /// - A URL is invalid
    /// - The period is empty or a duration is zero
    /// - Header, method, template or retry settings are invalid
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let api_key = cli
            .api_key
            .clone()
            .or_else(|| toml.and_then(|t| t.nebula.api_key.clone()))
            .filter(|key| !key.trim().is_empty());

        let api_url = Self::resolve_api_url(cli, toml)?;
        let period = Self::resolve_period(cli, toml)?;
        let poll_interval = Self::resolve_poll_interval(cli, toml)?;
        let clients = Self::resolve_clients(cli, toml)?;
        let webhook = Self::resolve_webhook(cli, toml)?;
        let retry_policy = Self::build_retry_policy(cli, toml)?;

        Ok(Self {
            api_key,
            api_url,
            period,
            poll_interval,
            clients,
            webhook,
            retry_policy,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
        })
    }

    /// Loads the file named by `cli.config`, if any, and merges it with `cli`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the merged
    /// configuration is invalid.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = match &cli.config {
            Some(path) => Some(TomlConfig::load(path)?),
            None => None,
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_api_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        let url_str = cli
            .api_url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.nebula.api_url.as_deref()))
            .unwrap_or(defaults::API_URL);

        parse_url(url_str)
    }

    fn resolve_period(cli: &Cli, toml: Option<&TomlConfig>) -> Result<String, ConfigError> {
        let period = cli
            .period
            .as_deref()
            .or_else(|| toml.and_then(|t| t.nebula.period.as_deref()))
            .unwrap_or(defaults::PERIOD)
            .trim();

        if period.is_empty() {
            return Err(ConfigError::InvalidPeriod(period.to_string()));
        }
        Ok(period.to_string())
    }

    fn resolve_poll_interval(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Duration, ConfigError> {
        let seconds = cli
            .poll_interval
            .or_else(|| toml.and_then(|t| t.monitor.poll_interval))
            .unwrap_or(defaults::POLL_INTERVAL_SECS);

        if seconds == 0 {
            return Err(ConfigError::InvalidDuration {
                field: "poll_interval",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Duration::from_secs(seconds))
    }

    /// CLI clients replace TOML clients entirely.
    fn resolve_clients(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Vec<ClientTarget>, ConfigError> {
        let parsed: Vec<ClientTarget> = if cli.clients.is_empty() {
            toml.map_or(&[][..], |t| t.clients.as_slice())
                .iter()
                .map(|entry| {
                    ClientTarget::new(&entry.site, &entry.mac).map_err(|reason| {
                        ConfigError::InvalidClient {
                            value: format!("{}/{}", entry.site, entry.mac),
                            reason,
                        }
                    })
                })
                .collect::<Result<_, _>>()?
        } else {
            cli.clients
                .iter()
                .map(|value| ClientTarget::parse(value))
                .collect::<Result<_, _>>()?
        };

        let mut clients: Vec<ClientTarget> = Vec::with_capacity(parsed.len());
        for target in parsed {
            if !clients.contains(&target) {
                clients.push(target);
            }
        }

        if clients.is_empty() {
            return Err(ConfigError::missing(
                field::CLIENTS,
                "Use --client SITE/MAC or add [[clients]] entries to the config file",
            ));
        }
        Ok(clients)
    }

    fn resolve_webhook(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Option<WebhookConfig>, ConfigError> {
        let section = toml.map(|t| &t.webhook);

        let method = cli
            .method
            .as_deref()
            .or_else(|| section.and_then(|w| w.method.as_deref()));
        let bearer = cli
            .bearer
            .as_deref()
            .or_else(|| section.and_then(|w| w.bearer.as_deref()));
        let body_template = cli
            .body_template
            .clone()
            .or_else(|| section.and_then(|w| w.body_template.clone()));

        let Some(url_str) = cli
            .url
            .as_deref()
            .or_else(|| section.and_then(|w| w.url.as_deref()))
        else {
            // Webhook-only CLI options make no sense without a URL.
            if cli.method.is_some() {
                return Err(ConfigError::WebhookWithoutUrl("method"));
            }
            if !cli.headers.is_empty() {
                return Err(ConfigError::WebhookWithoutUrl("header"));
            }
            if cli.bearer.is_some() {
                return Err(ConfigError::WebhookWithoutUrl("bearer"));
            }
            if cli.body_template.is_some() {
                return Err(ConfigError::WebhookWithoutUrl("body-template"));
            }
            return Ok(None);
        };

        let url = parse_url(url_str)?;

        let method_str = method.unwrap_or(defaults::METHOD);
        let method = method_str
            .parse::<Method>()
            .map_err(|_| ConfigError::InvalidMethod(method_str.to_string()))?;

        let mut headers = HeaderMap::new();
        if let Some(section) = section {
            for (name, value) in &section.headers {
                headers.insert(parse_header_name(name)?, parse_header_value(name, value)?);
            }
        }
        for header_str in &cli.headers {
            let (name, value) = parse_header_string(header_str)?;
            headers.insert(parse_header_name(&name)?, parse_header_value(&name, &value)?);
        }
        if let Some(token) = bearer {
            let value = parse_header_value("Authorization", &format!("Bearer {token}"))?;
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(template) = &body_template {
            Template::compile(template).map_err(|e| ConfigError::InvalidTemplate {
                reason: e.to_string(),
            })?;
        }

        Ok(Some(WebhookConfig {
            url,
            method,
            headers,
            body_template,
        }))
    }

    fn build_retry_policy(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<RetryPolicy, ConfigError> {
        let retry = toml.map(|t| &t.retry);

        let max_attempts = cli
            .retry_max
            .or_else(|| retry.and_then(|r| r.max_attempts))
            .unwrap_or(defaults::RETRY_MAX_ATTEMPTS);

        let initial_delay_secs = cli
            .retry_delay
            .or_else(|| retry.and_then(|r| r.initial_delay))
            .unwrap_or(defaults::RETRY_INITIAL_DELAY_SECS);

        let max_delay_secs = retry
            .and_then(|r| r.max_delay)
            .unwrap_or(defaults::RETRY_MAX_DELAY_SECS);

        let multiplier = retry
            .and_then(|r| r.multiplier)
            .unwrap_or(defaults::RETRY_MULTIPLIER);

        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if initial_delay_secs == 0 {
            return Err(ConfigError::InvalidRetry(
                "initial_delay must be greater than 0".to_string(),
            ));
        }

        if multiplier <= 0.0 || !multiplier.is_finite() {
            return Err(ConfigError::InvalidRetry(
                "multiplier must be a positive finite number".to_string(),
            ));
        }

        if max_delay_secs < initial_delay_secs {
            return Err(ConfigError::InvalidRetry(format!(
                "max_delay ({max_delay_secs}s) must be >= initial_delay ({initial_delay_secs}s)"
            )));
        }

        Ok(RetryPolicy::new()
            .with_max_attempts(max_attempts)
            .with_initial_delay(Duration::from_secs(initial_delay_secs))
            .with_max_delay(Duration::from_secs(max_delay_secs))
            .with_multiplier(multiplier))
    }
}

/// Writes the commented configuration template to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_url(url_str: &str) -> Result<Url, ConfigError> {
    Url::parse(url_str).map_err(|e| ConfigError::InvalidUrl {
        url: url_str.to_string(),
        reason: e.to_string(),
    })
}

fn parse_header_string(s: &str) -> Result<(String, String), ConfigError> {
    s.split_once('=')
        .or_else(|| s.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| ConfigError::InvalidHeader {
            value: s.to_string(),
        })
}

fn parse_header_name(name: &str) -> Result<HeaderName, ConfigError> {
    name.parse::<HeaderName>()
        .map_err(|e| ConfigError::InvalidHeaderName {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeaderValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
