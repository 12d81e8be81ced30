//! Tests for configuration validation.

use super::*;
use crate::schema::SiteConfig;

fn config_with_site(key: &str, site: SiteConfig) -> Config {
    let mut config = Config::default();
    config.sites.insert(key.to_string(), site);
    config
}

#[test]
fn test_default_config_is_valid() {
    let result = ConfigValidator::validate(&Config::default());
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_zero_discovery_retry_rejected() {
    let mut config = Config::default();
    config.watcher.discovery_retry_ms = 0;
    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].path, "watcher.discovery_retry_ms");
}

#[test]
fn test_zero_max_errors_rejected() {
    let mut config = Config::default();
    config.supervisor.max_errors = 0;
    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "supervisor.max_errors"));
}

#[test]
fn test_zero_reconnect_attempts_rejected() {
    let mut config = Config::default();
    config.supervisor.reconnect.max_attempts = 0;
    let result = ConfigValidator::validate(&config);
    assert!(
        result
            .errors
            .iter()
            .any(|e| e.path == "supervisor.reconnect.max_attempts")
    );
}

#[test]
fn test_short_cooldown_warns() {
    let mut config = Config::default();
    config.supervisor.error_cooldown_ms = 500;
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_zero_threshold_rejected() {
    let config = config_with_site(
        "hulu",
        SiteConfig {
            confirmation_threshold: Some(0),
            ..Default::default()
        },
    );
    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert_eq!(result.errors[0].path, "sites.hulu.confirmation_threshold");
}

#[test]
fn test_zero_release_threshold_rejected() {
    let config = config_with_site(
        "paramount",
        SiteConfig {
            release_threshold: Some(0),
            ..Default::default()
        },
    );
    assert!(!ConfigValidator::validate(&config).is_valid());
}

#[test]
fn test_unusual_interval_warns() {
    let config = config_with_site(
        "twitch",
        SiteConfig {
            interval_ms: Some(5000),
            ..Default::default()
        },
    );
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert_eq!(result.warnings[0].path, "sites.twitch.interval_ms");
}

#[test]
fn test_unknown_site_warns() {
    let config = config_with_site("netflix", SiteConfig::default());
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings[0].message.contains("netflix"));
}
