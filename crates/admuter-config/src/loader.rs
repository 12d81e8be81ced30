//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, or defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.admuter`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BackoffKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.supervisor.max_errors, 5);
        assert_eq!(config.watcher.discovery_retry_ms, 1000);
    }

    #[test]
    fn test_load_supervisor_section() {
        let content = r#"
            [supervisor]
            max_errors = 3
            error_cooldown_ms = 30000

            [supervisor.reconnect]
            max_attempts = 8
            backoff = "linear"
            interval_ms = 500
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.supervisor.max_errors, 3);
        assert_eq!(config.supervisor.error_cooldown_ms, 30000);
        assert_eq!(config.supervisor.invalidation_restart_ms, 1000);
        assert_eq!(config.supervisor.reconnect.max_attempts, 8);
        assert_eq!(config.supervisor.reconnect.backoff, BackoffKind::Linear);
    }

    #[test]
    fn test_load_site_overrides() {
        let content = r#"
            [sites.hulu]
            confirmation_threshold = 2

            [sites.twitch]
            enabled = false
            interval_ms = 750
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        let hulu = config.site("hulu").unwrap();
        assert_eq!(hulu.confirmation_threshold, Some(2));
        assert!(hulu.enabled);
        let twitch = config.site("twitch").unwrap();
        assert!(!twitch.enabled);
        assert_eq!(twitch.interval_ms, Some(750));
        assert!(config.site("youtube").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/admuter.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/admuter.toml")).unwrap();
        assert_eq!(config.supervisor.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("ADMUTER_TEST_STORE", "/tmp/admuter-state.json");
        }
        let content = "[store]\npath = \"${ADMUTER_TEST_STORE}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.store.path.as_deref(), Some("/tmp/admuter-state.json"));
        unsafe {
            std::env::remove_var("ADMUTER_TEST_STORE");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_ADMUTER_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }
}
