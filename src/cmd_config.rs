//! Configuration and site listing subcommands.

use std::path::Path;

use admuter_config::{Config, ConfigLoader, ConfigValidator};
use admuter_detector::{SiteProfile, tuned_profile};
use admuter_protocols::Site;

/// Load the configuration file and report validation problems.
pub(crate) fn check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = if path.exists() {
        ConfigLoader::load(path)?
    } else {
        println!("{} not found, checking defaults", path.display());
        Config::default()
    };

    let result = ConfigValidator::validate(&config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        return Err(format!("{} configuration error(s)", result.errors.len()).into());
    }
    println!("Configuration OK ({} warning(s))", result.warnings.len());
    Ok(())
}

/// Print every supported site with its effective tuning.
pub(crate) fn list_sites(config: &Config) {
    println!(
        "{:<10} {:<12} {:<24} {:>9} {:>9} {:>7} {}",
        "KEY", "SITE", "CONTAINER", "INTERVAL", "CONFIRM", "RELEASE", "ENABLED"
    );
    println!("{}", "-".repeat(84));
    for site in Site::ALL {
        println!("{}", site_row(site, config));
    }
}

fn site_row(site: Site, config: &Config) -> String {
    let profile = tuned_profile(site, config);
    let policy = profile.confirmation();
    format!(
        "{:<10} {:<12} {:<24} {:>7}ms {:>9} {:>7} {}",
        site.key(),
        site.display_name(),
        profile.player_selector(),
        profile.periodic_interval().as_millis(),
        policy.threshold,
        policy.release_threshold,
        if config.is_site_enabled(site.key()) { "yes" } else { "no" }
    )
}
