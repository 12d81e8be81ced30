//! AdMuter - mutes streaming-site tabs while video ads play.
//!
//! Main entry point for the AdMuter CLI.

mod cli;
mod cmd_config;
mod cmd_replay;
mod cmd_state;

use std::path::Path;

use clap::Parser;
use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use admuter_config::{Config, ConfigLoader};

use cli::{Cli, Commands, ConfigAction};

/// Initialize tracing with console and file output.
///
/// Log files are written to the configured log directory with daily rotation.
fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("admuter")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer on drop; keep it for the whole run
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(ConfigLoader::load_or_default(path)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config)?;
    debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Commands::Replay {
            site,
            timeline,
            json,
        } => cmd_replay::handle_replay(config, site, timeline, json).await,
        Commands::Metrics { json } => cmd_state::show_metrics(&config, json).await,
        Commands::Enable => cmd_state::set_enabled(&config, true).await,
        Commands::Disable => cmd_state::set_enabled(&config, false).await,
        Commands::Install => cmd_state::install(&config).await,
        Commands::Sites => {
            cmd_config::list_sites(&config);
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Check => cmd_config::check(&cli.config),
        },
    }
}
