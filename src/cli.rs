//! CLI definitions for AdMuter.

use std::path::PathBuf;

use admuter_protocols::Site;
use clap::{Parser, Subcommand};

/// AdMuter CLI.
#[derive(Parser)]
#[command(name = "admuter")]
#[command(about = "Mute streaming-site tabs while video ads play")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Replay a recorded page timeline through a detector
    Replay {
        /// Site profile to use; defaults to the site named in the timeline
        #[arg(long)]
        site: Option<Site>,

        /// JSON timeline of DOM frames
        #[arg(long)]
        timeline: PathBuf,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show ads muted and time saved
    Metrics {
        /// Print the raw stored settings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn ad muting on
    Enable,

    /// Turn ad muting off
    Disable,

    /// Reset stored settings and metrics to first-run defaults
    Install,

    /// List supported sites and their detection tuning
    Sites,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Load and validate the configuration file
    Check,
}
