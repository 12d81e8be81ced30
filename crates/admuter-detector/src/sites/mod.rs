//! Built-in site profiles.
//!
//! | Site | Container | Interval | Threshold |
//! |------|-----------|----------|-----------|
//! | YouTube | `#player-container` | 1000ms | 1 |
//! | Hulu | `#content-video-player` | 1000ms | 3 |
//! | HBO Max | `.video-player` | 500ms | 3 |
//! | Paramount+ | `#video-player` | 250ms | 2 |
//! | Peacock | `html` | 500ms | 1 |
//! | Twitch | `.video-player` | 500ms | 1 |

mod hbomax;
mod hulu;
mod paramount;
mod peacock;
mod twitch;
mod youtube;

pub use hbomax::HboMaxProfile;
pub use hulu::HuluProfile;
pub use paramount::ParamountProfile;
pub use peacock::PeacockProfile;
pub use twitch::TwitchProfile;
pub use youtube::YouTubeProfile;

use admuter_config::Config;
use admuter_protocols::Site;

use crate::profile::{SiteProfile, Tuned};

/// Default profile for `site`.
pub fn profile_for(site: Site) -> Box<dyn SiteProfile> {
    match site {
        Site::YouTube => Box::new(YouTubeProfile::new()),
        Site::Hulu => Box::new(HuluProfile::new()),
        Site::HboMax => Box::new(HboMaxProfile::new()),
        Site::Paramount => Box::new(ParamountProfile::new()),
        Site::Peacock => Box::new(PeacockProfile::new()),
        Site::Twitch => Box::new(TwitchProfile::new()),
    }
}

/// Profile for `site` with the overrides from `config` applied.
pub fn tuned_profile(site: Site, config: &Config) -> Tuned<Box<dyn SiteProfile>> {
    Tuned::from_config(profile_for(site), config.site(site.key()))
}

#[cfg(test)]
#[path = "sites_tests.rs"]
mod tests;
