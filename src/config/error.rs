//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write the configuration file (init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A required value was given neither on the command line nor in the file.
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired {
        /// Name of the missing field
        field: &'static str,
        /// How to provide the value
        hint: &'static str,
    },

    /// A URL did not parse.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// A monitored client entry is malformed.
    #[error("Invalid client '{value}': {reason}")]
    InvalidClient {
        /// The rejected entry
        value: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The lookback period is empty.
    #[error("Invalid period '{0}': must not be empty")]
    InvalidPeriod(String),

    /// A duration is zero or out of range.
    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid retry configuration.
    #[error("Invalid retry configuration: {0}")]
    InvalidRetry(String),

    /// Invalid HTTP method.
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// Header argument not in `Key=Value` or `Key: Value` form.
    #[error("Invalid header format '{value}': expected 'Key=Value' or 'Key: Value'")]
    InvalidHeader {
        /// The rejected header string
        value: String,
    },

    /// Invalid header name.
    #[error("Invalid header name '{name}': {reason}")]
    InvalidHeaderName {
        /// The rejected name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Invalid header value.
    #[error("Invalid header value for '{name}': {reason}")]
    InvalidHeaderValue {
        /// The header name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Body template does not compile.
    #[error("Invalid body template: {reason}")]
    InvalidTemplate {
        /// Compiler message
        reason: String,
    },

    /// Webhook options were given without a webhook URL.
    #[error("Webhook option '{0}' requires a webhook URL")]
    WebhookWithoutUrl(&'static str),
}

/// Field names used in [`ConfigError::MissingRequired`].
pub mod field {
    /// The monitored clients list.
    pub const CLIENTS: &str = "clients";
}

impl ConfigError {
    /// Creates a `MissingRequired` error.
    #[must_use]
    pub const fn missing(field: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { field, hint }
    }
}
