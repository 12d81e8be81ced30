//! Peacock: the ad countdown ring inside the ad countdown container.

use std::time::Duration;

use admuter_protocols::{ObserveOptions, Page, Site};

use crate::error::ProbeFault;
use crate::probe;
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const COUNTDOWN_RING: &str = ".countdown__foreground-ring";
const COUNTDOWN_CONTAINER: &str = ".countdown-container.ad-countdown__container";
const REMAINING_TIME: &str =
    ".countdown-container.ad-countdown__container .countdown__remaining-time";

/// Watches the whole document; the player has no stable container.
#[derive(Debug, Clone, Default)]
pub struct PeacockProfile;

impl PeacockProfile {
    pub fn new() -> Self {
        Self
    }
}

impl SiteProfile for PeacockProfile {
    fn site(&self) -> Site {
        Site::Peacock
    }

    fn player_selector(&self) -> &'static str {
        "html"
    }

    fn container_fallback(&self) -> Option<&'static str> {
        None
    }

    fn observe_options(&self) -> ObserveOptions {
        ObserveOptions::TREE_AND_ATTRIBUTES
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::IMMEDIATE
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ring = probe::is_present(page, COUNTDOWN_RING)?;
        let container = probe::is_present(page, COUNTDOWN_CONTAINER)?;
        let detected = ring && container;

        // Informational only; the ad duration is always measured.
        let remaining = if detected {
            probe::countdown(page, REMAINING_TIME, false)?
        } else {
            None
        };

        Ok(AdSignal::new()
            .flag("countdown_ring", ring)
            .flag("countdown_container", container)
            .number("remaining_seconds", remaining.map(|secs| secs as f64))
            .with_detected(detected))
    }
}
