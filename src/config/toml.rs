//! TOML configuration file parsing.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root of the configuration file.
///
/// Every field is optional so a partial file can be merged with CLI
/// arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Nebula API access
    #[serde(default)]
    pub nebula: NebulaSection,

    /// Polling settings
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Monitored clients
    #[serde(default)]
    pub clients: Vec<ClientEntry>,

    /// Webhook delivery
    #[serde(default)]
    pub webhook: WebhookSection,

    /// Webhook retry policy
    #[serde(default)]
    pub retry: RetrySection,
}

/// `[nebula]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NebulaSection {
    /// API key sent with every request
    pub api_key: Option<String>,

    /// Base URL of the API
    pub api_url: Option<String>,

    /// Lookback period for the client list
    pub period: Option<String>,
}

/// `[monitor]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Polling interval in seconds
    pub poll_interval: Option<u64>,
}

/// One `[[clients]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientEntry {
    /// Site the client belongs to
    pub site: String,

    /// MAC address as reported by the API
    pub mac: String,
}

/// `[webhook]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSection {
    /// Webhook URL
    pub url: Option<String>,

    /// HTTP method (default: POST)
    pub method: Option<String>,

    /// HTTP headers as key-value pairs
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Bearer token for the Authorization header
    pub bearer: Option<String>,

    /// Handlebars body template
    pub body_template: Option<String>,
}

/// `[retry]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Maximum number of attempts
    pub max_attempts: Option<u32>,

    /// Initial retry delay in seconds
    pub initial_delay: Option<u64>,

    /// Maximum retry delay in seconds
    pub max_delay: Option<u64>,

    /// Backoff multiplier
    pub multiplier: Option<f64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a commented configuration file.
#[must_use]
pub fn default_config_template() -> String {
    r#"# nebula-presence configuration file

[nebula]
# API key for the Nebula cloud API (required for polling to succeed)
# api_key = "your-api-key"

# Base URL of the API (default: https://api.nebula.zyxel.com)
# api_url = "https://api.nebula.zyxel.com"

# Lookback period for the client list (default: 2h)
# period = "2h"

[monitor]
# Polling interval in seconds (default: 30)
poll_interval = 30

# Clients to monitor. Each entry is a site id and a MAC address, matched
# exactly against the API's client list.
# Note: --client CLI arguments REPLACE these entries entirely.
# [[clients]]
# site = "your-site-id"
# mac = "AA:BB:CC:DD:EE:FF"

[webhook]
# Webhook URL. Without it, events are only logged.
# url = "https://hooks.example.com/presence"

# HTTP method (default: POST)
# method = "POST"

# HTTP headers
# [webhook.headers]
# X-Custom-Header = "value"

# Bearer token for the Authorization header
# bearer = "your-token-here"

# Handlebars body template (default: JSON with all variables)
# Available variables: {{site}}, {{client}}, {{kind}}, {{timestamp}}
# body_template = '{"text": "{{client}} {{kind}}"}'

[retry]
# Maximum number of delivery attempts (default: 3)
# max_attempts = 3

# Initial retry delay in seconds (default: 5)
# initial_delay = 5

# Maximum retry delay in seconds (default: 60)
# max_delay = 60

# Backoff multiplier (default: 2.0)
# multiplier = 2.0
"#
    .to_string()
}
