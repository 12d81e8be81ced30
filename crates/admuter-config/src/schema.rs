//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Per-site tuning, keyed by site key (`youtube`, `hulu`, ...).
    #[serde(default)]
    pub sites: HashMap<String, SiteConfig>,
}

impl Config {
    /// Tuning for one site, if the config mentions it.
    pub fn site(&self, key: &str) -> Option<&SiteConfig> {
        self.sites.get(key)
    }

    /// Sites are enabled unless a `[sites.<key>]` table says otherwise.
    pub fn is_site_enabled(&self, key: &str) -> bool {
        self.site(key).map(|s| s.enabled).unwrap_or(true)
    }

    /// Where the authority persists its state.
    pub fn store_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) => PathBuf::from(ConfigLoader::expand_path(path)),
            None => admuter_dir().join("state.json"),
        }
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        match &self.logging.log_dir {
            Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
            None => admuter_dir().join("logs"),
        }
    }
}

/// The `~/.admuter` directory, or `.admuter` when there is no home.
pub fn admuter_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".admuter"))
        .unwrap_or_else(|| PathBuf::from(".admuter"))
}

/// Authority state persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON state file; `~` is expanded.
    #[serde(default)]
    pub path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Mutation watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Delay between player-container discovery attempts.
    #[serde(default = "default_discovery_retry_ms")]
    pub discovery_retry_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            discovery_retry_ms: default_discovery_retry_ms(),
        }
    }
}

fn default_discovery_retry_ms() -> u64 {
    1000
}

/// Reconnection supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Consecutive faults before detection is paused.
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,

    /// Pause after hitting `max_errors`.
    #[serde(default = "default_error_cooldown_ms")]
    pub error_cooldown_ms: u64,

    /// Restart delay after the privileged context was invalidated.
    #[serde(default = "default_invalidation_restart_ms")]
    pub invalidation_restart_ms: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
            error_cooldown_ms: default_error_cooldown_ms(),
            invalidation_restart_ms: default_invalidation_restart_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_max_errors() -> u32 {
    5
}

fn default_error_cooldown_ms() -> u64 {
    60_000
}

fn default_invalidation_restart_ms() -> u64 {
    1000
}

/// Startup reconnection loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// Fixed delay, or the per-attempt step for linear backoff.
    #[serde(default = "default_reconnect_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffKind::default(),
            interval_ms: default_reconnect_interval_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_reconnect_interval_ms() -> u64 {
    2000
}

/// Shape of the delay between reconnection attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// Delay grows by one interval per attempt.
    Linear,
}

/// Per-site tuning overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive positive cycles before an ad is trusted.
    #[serde(default)]
    pub confirmation_threshold: Option<u32>,

    /// Consecutive negative cycles before an active ad is released.
    #[serde(default)]
    pub release_threshold: Option<u32>,

    /// Periodic re-evaluation interval.
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confirmation_threshold: None,
            release_threshold: None,
            interval_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}
