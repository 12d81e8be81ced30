//! Persistent authority state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AuthorityError;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Everything the authority persists, under the keys the settings UI reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub ad_muter_enabled: bool,
    #[serde(default)]
    pub ads_muted: u64,
    #[serde(default)]
    pub seconds_saved: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ad_muter_enabled: default_enabled(),
            ads_muted: 0,
            seconds_saved: 0,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Key/value storage for [`Settings`].
///
/// Callers serialize read-modify-write sequences themselves; a store only
/// guarantees that a single `save` is not observed half-written.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings, or the defaults when nothing was stored yet.
    async fn load(&self) -> Result<Settings, AuthorityError>;

    /// Replace the stored settings.
    async fn save(&self, settings: &Settings) -> Result<(), AuthorityError>;
}

/// In-memory store for tests and one-shot replays.
pub struct MemoryStore {
    settings: RwLock<Option<Settings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(None),
        }
    }

    /// Store pre-populated with `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Settings, AuthorityError> {
        Ok(self.settings.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, settings: &Settings) -> Result<(), AuthorityError> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

/// Single JSON document on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash never leaves a truncated document behind.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Settings, AuthorityError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state at {}, using defaults", self.path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<(), AuthorityError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(settings)?;
        let staging = self.staging_path();
        fs::write(&staging, content).await?;
        fs::rename(&staging, &self.path).await?;
        debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
