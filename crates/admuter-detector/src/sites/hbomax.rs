//! HBO Max: visual ad markers.

use std::time::Duration;

use admuter_protocols::{Page, Site};

use crate::error::ProbeFault;
use crate::probe;
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const AD_MARKERS: &[&str] = &[
    ".ad-container",
    ".ad-overlay",
    ".ad-banner",
    "[data-testid=\"ad-overlay\"]",
    "[data-testid=\"ad-banner\"]",
    ".player-ad-overlay",
    ".ad-pause-card",
];

#[derive(Debug, Clone, Default)]
pub struct HboMaxProfile;

impl HboMaxProfile {
    pub fn new() -> Self {
        Self
    }
}

impl SiteProfile for HboMaxProfile {
    fn site(&self) -> Site {
        Site::HboMax
    }

    fn player_selector(&self) -> &'static str {
        ".video-player"
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::confirmed(3)
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ad_marker = probe::any_present(page, AD_MARKERS)?;
        Ok(AdSignal::new()
            .flag("ad_marker", ad_marker)
            .with_detected(ad_marker))
    }
}
