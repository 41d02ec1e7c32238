//! Tests for TOML configuration parsing.

use super::toml::{ClientEntry, TomlConfig, default_config_template};

mod parsing {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [nebula]
            api_key = "secret"
            api_url = "https://nebula.test"
            period = "1h"

            [monitor]
            poll_interval = 15

            [[clients]]
            site = "S1"
            mac = "AA:BB"

            [[clients]]
            site = "S2"
            mac = "CC:DD"

            [webhook]
            url = "https://hooks.test"
            method = "PUT"
            bearer = "token"
            body_template = '{"c": "{{client}}"}'

            [webhook.headers]
            X-Custom = "value"

            [retry]
            max_attempts = 4
            initial_delay = 2
            max_delay = 30
            multiplier = 1.5
        "#;

        let config = TomlConfig::parse(toml).unwrap();

        assert_eq!(config.nebula.api_key.as_deref(), Some("secret"));
        assert_eq!(config.nebula.api_url.as_deref(), Some("https://nebula.test"));
        assert_eq!(config.nebula.period.as_deref(), Some("1h"));
        assert_eq!(config.monitor.poll_interval, Some(15));
        assert_eq!(
            config.clients,
            vec![
                ClientEntry {
                    site: "S1".to_string(),
                    mac: "AA:BB".to_string()
                },
                ClientEntry {
                    site: "S2".to_string(),
                    mac: "CC:DD".to_string()
                },
            ]
        );
        assert_eq!(config.webhook.url.as_deref(), Some("https://hooks.test"));
        assert_eq!(config.webhook.method.as_deref(), Some("PUT"));
        assert_eq!(config.webhook.bearer.as_deref(), Some("token"));
        assert_eq!(
            config.webhook.headers.get("X-Custom").map(String::as_str),
            Some("value")
        );
        assert_eq!(config.retry.max_attempts, Some(4));
        assert_eq!(config.retry.initial_delay, Some(2));
        assert_eq!(config.retry.max_delay, Some(30));
        assert_eq!(config.retry.multiplier, Some(1.5));
    }

    #[test]
    fn empty_config_uses_section_defaults() {
        let config = TomlConfig::parse("").unwrap();

        assert!(config.nebula.api_key.is_none());
        assert!(config.clients.is_empty());
        assert!(config.webhook.url.is_none());
        assert!(config.webhook.headers.is_empty());
        assert!(config.monitor.poll_interval.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(TomlConfig::parse("[nebula]\napi_token = \"x\"").is_err());
        assert!(TomlConfig::parse("[[clients]]\nsite = \"S1\"\nmac = \"A\"\nname = \"x\"").is_err());
        assert!(TomlConfig::parse("[filter]\ninclude = []").is_err());
    }

    #[test]
    fn client_entry_requires_both_fields() {
        assert!(TomlConfig::parse("[[clients]]\nsite = \"S1\"").is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(TomlConfig::parse("[nebula").is_err());
    }
}

mod loading {
    use super::*;
    use crate::config::ConfigError;
    use std::io::Write;

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[monitor]\npoll_interval = 45").unwrap();

        let config = TomlConfig::load(file.path()).unwrap();

        assert_eq!(config.monitor.poll_interval, Some(45));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = TomlConfig::load(&path).unwrap_err();

        assert!(matches!(err, ConfigError::FileRead { path: p, .. } if p == path));
    }
}

mod template {
    use super::*;

    #[test]
    fn default_template_parses() {
        let config = TomlConfig::parse(&default_config_template()).unwrap();

        assert_eq!(config.monitor.poll_interval, Some(30));
        assert!(config.clients.is_empty());
    }

    #[test]
    fn default_template_documents_variables() {
        let template = default_config_template();

        for var in ["{{site}}", "{{client}}", "{{kind}}", "{{timestamp}}"] {
            assert!(template.contains(var), "missing {var}");
        }
    }
}
