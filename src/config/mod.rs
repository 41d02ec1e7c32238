//! Configuration layer for nebula-presence.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`], [`ClientTarget`], [`WebhookConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments**
//! 2. **TOML config file**
//! 3. **Built-in defaults**
//!
//! Monitored clients use replace semantics: any `--client` argument
//! replaces the file's `[[clients]]` list rather than adding to it.
//!
//! # Missing API key
//!
//! A missing API key is not a configuration error. Polling starts anyway and
//! every cycle fails with an authentication error until a key is configured.
//!
//! # TOML-only options
//!
//! `retry.max_delay` and `retry.multiplier` have no CLI flag.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod toml_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{ClientEntry, TomlConfig, default_config_template};
pub use validated::{ClientTarget, ValidatedConfig, WebhookConfig, write_default_config};
