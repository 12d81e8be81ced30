//! Twitch: ad label markers.

use std::time::Duration;

use admuter_protocols::{Page, Site};

use crate::error::ProbeFault;
use crate::probe;
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const AD_MARKERS: &[&str] = &[
    "[aria-label=\"Ad\"]",
    "[data-a-target=\"video-ad-label\"]",
    ".video-player__overlay[data-a-target=\"player-overlay-ad-alert\"]",
];

#[derive(Debug, Clone, Default)]
pub struct TwitchProfile;

impl TwitchProfile {
    pub fn new() -> Self {
        Self
    }
}

impl SiteProfile for TwitchProfile {
    fn site(&self) -> Site {
        Site::Twitch
    }

    fn player_selector(&self) -> &'static str {
        ".video-player"
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::IMMEDIATE
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ad_marker = probe::any_present(page, AD_MARKERS)?;
        Ok(AdSignal::new()
            .flag("ad_marker", ad_marker)
            .with_detected(ad_marker))
    }
}
