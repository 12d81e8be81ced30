//! Hulu: visual ad markers or playhead discontinuities.

use std::time::Duration;

use admuter_protocols::{Page, Site};

use crate::error::ProbeFault;
use crate::probe::{self, PlayheadTracker};
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const AD_MARKERS: &[&str] = &[
    ".ad-container",
    ".AdUnitView",
    ".ad-overlay",
    ".ad-progress-bar",
    "[data-automation-id=\"ad-unit\"]",
    "[data-automationid=\"player-ad-notice\"]",
    ".AdBanner",
    ".AdTag",
    "[data-ad-break-type]",
    "[data-ad-break-start]",
];

/// Hulu needs three agreeing cycles because playhead jumps alone are noisy.
#[derive(Debug, Clone, Default)]
pub struct HuluProfile {
    playhead: PlayheadTracker,
}

impl HuluProfile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SiteProfile for HuluProfile {
    fn site(&self) -> Site {
        Site::Hulu
    }

    fn player_selector(&self) -> &'static str {
        "#content-video-player"
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(1000)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::confirmed(3)
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ad_marker = probe::any_present(page, AD_MARKERS)?;
        let discontinuity = match probe::video(page)? {
            Some(state) => self.playhead.observe(state),
            None => false,
        };

        Ok(AdSignal::new()
            .flag("ad_marker", ad_marker)
            .flag("playhead_discontinuity", discontinuity)
            .with_detected(ad_marker || discontinuity))
    }

    fn reset(&mut self) {
        self.playhead.reset();
    }
}
