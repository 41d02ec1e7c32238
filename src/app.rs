//! Application startup and utilities.
//!
//! Exit codes, tracing setup and configuration error hints for the main
//! entry point.

use nebula_presence::config::{ConfigError, field};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Configuration error (exit code 1).
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2).
    ///
    /// A function because `ExitCode::from()` is not `const fn`.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Returns a follow-up hint for common configuration errors.
#[must_use]
pub fn config_hint(error: &ConfigError) -> Option<&'static str> {
    const INIT_HINT: &str = "Run 'nebula-presence init' to generate a configuration template.";
    match error {
        ConfigError::MissingRequired { field: f, .. } if *f == field::CLIENTS => Some(INIT_HINT),
        ConfigError::FileRead { .. } => Some(INIT_HINT),
        ConfigError::InvalidClient { .. } => {
            Some("Clients are given as SITE/MAC, e.g. --client my-site/AA:BB:CC:DD:EE:FF")
        }
        _ => None,
    }
}

/// Prints the hint for `error`, if there is one.
pub fn print_config_hint(error: &ConfigError) {
    if let Some(hint) = config_hint(error) {
        eprintln!("\n{hint}");
    }
}

/// Sets up the tracing subscriber for logging.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_clients_suggests_init() {
        let error = ConfigError::missing(field::CLIENTS, "hint");

        assert!(config_hint(&error).unwrap().contains("init"));
    }

    #[test]
    fn invalid_client_shows_format() {
        let error = ConfigError::InvalidClient {
            value: "x".to_string(),
            reason: "expected SITE/MAC",
        };

        assert!(config_hint(&error).unwrap().contains("SITE/MAC"));
    }

    #[test]
    fn other_errors_have_no_hint() {
        assert!(config_hint(&ConfigError::InvalidMethod("X".to_string())).is_none());
    }
}
