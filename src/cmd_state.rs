//! Subcommands that read or change the persisted authority state.

use std::sync::Arc;

use admuter_authority::{Authority, JsonFileStore, MemoryTabs, format_time_saved};
use admuter_config::Config;
use tracing::info;

fn open_authority(config: &Config) -> Authority {
    let path = config.store_path();
    info!("Using state file {}", path.display());
    Authority::new(
        Arc::new(JsonFileStore::new(path)),
        Arc::new(MemoryTabs::new()),
    )
}

/// Print the accumulated metrics.
pub(crate) async fn show_metrics(
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = open_authority(config).settings().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("Ads muted:  {}", settings.ads_muted);
    println!("Time saved: {}", format_time_saved(settings.seconds_saved));
    println!(
        "Status:     {}",
        if settings.ad_muter_enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Persist the enablement flag.
pub(crate) async fn set_enabled(
    config: &Config,
    enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let notified = open_authority(config).set_enabled(enabled).await?;
    info!("Enablement change delivered to {} tab(s)", notified);
    println!("AdMuter {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

/// Reset settings and metrics to their first-run values.
pub(crate) async fn install(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    open_authority(config).install().await?;
    println!("Installed defaults at {}", config.store_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use admuter_authority::{Settings, SettingsStore};
    use admuter_config::StoreConfig;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            store: StoreConfig {
                path: Some(dir.path().join("state.json").display().to_string()),
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_disable_then_enable_persists() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let store = JsonFileStore::new(config.store_path());

        set_enabled(&config, false).await.unwrap();
        assert!(!store.load().await.unwrap().ad_muter_enabled);

        set_enabled(&config, true).await.unwrap();
        assert!(store.load().await.unwrap().ad_muter_enabled);
    }

    #[tokio::test]
    async fn test_install_overwrites_metrics() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let store = JsonFileStore::new(config.store_path());
        store
            .save(&Settings {
                ad_muter_enabled: false,
                ads_muted: 12,
                seconds_saved: 400,
            })
            .await
            .unwrap();

        install(&config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Settings::default());
        show_metrics(&config, false).await.unwrap();
    }
}
