//! Configuration validation.

use crate::schema::Config;

/// Known site keys; anything else under `[sites]` is a typo.
const SITE_KEYS: [&str; 6] = ["youtube", "hulu", "hbomax", "paramount", "peacock", "twitch"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_watcher(config, &mut result);
        Self::validate_supervisor(config, &mut result);
        Self::validate_sites(config, &mut result);

        result
    }

    fn validate_watcher(config: &Config, result: &mut ValidationResult) {
        if config.watcher.discovery_retry_ms == 0 {
            result.add_error(ValidationError::new(
                "watcher.discovery_retry_ms",
                "Discovery retry must be greater than 0 (a zero delay busy-loops)",
            ));
        }
    }

    fn validate_supervisor(config: &Config, result: &mut ValidationResult) {
        let supervisor = &config.supervisor;

        if supervisor.max_errors == 0 {
            result.add_error(ValidationError::new(
                "supervisor.max_errors",
                "max_errors must be greater than 0",
            ));
        }

        if supervisor.reconnect.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "supervisor.reconnect.max_attempts",
                "max_attempts must be greater than 0",
            ));
        }

        if supervisor.reconnect.interval_ms == 0 {
            result.add_error(ValidationError::new(
                "supervisor.reconnect.interval_ms",
                "interval_ms must be greater than 0",
            ));
        }

        if supervisor.error_cooldown_ms < supervisor.invalidation_restart_ms {
            result.add_warning(ValidationWarning::new(
                "supervisor.error_cooldown_ms",
                "Error cooldown is shorter than the invalidation restart delay",
            ));
        }
    }

    fn validate_sites(config: &Config, result: &mut ValidationResult) {
        for (key, site) in &config.sites {
            let path = format!("sites.{}", key);

            if !SITE_KEYS.contains(&key.as_str()) {
                result.add_warning(ValidationWarning::new(
                    &path,
                    format!("Unknown site '{}', it will be ignored", key),
                ));
            }

            if site.confirmation_threshold == Some(0) {
                result.add_error(ValidationError::new(
                    format!("{}.confirmation_threshold", path),
                    "confirmation_threshold must be at least 1",
                ));
            }

            if site.release_threshold == Some(0) {
                result.add_error(ValidationError::new(
                    format!("{}.release_threshold", path),
                    "release_threshold must be at least 1",
                ));
            }

            match site.interval_ms {
                Some(0) => result.add_error(ValidationError::new(
                    format!("{}.interval_ms", path),
                    "interval_ms must be greater than 0",
                )),
                Some(ms) if !(250..=1000).contains(&ms) => {
                    result.add_warning(ValidationWarning::new(
                        format!("{}.interval_ms", path),
                        format!("interval_ms {} is outside the usual 250-1000 ms range", ms),
                    ))
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
