//! Paramount+: IMA iframe, ad click layer, ad container, or a running
//! countdown corroborated by a visual marker.

use std::time::Duration;

use admuter_protocols::{Page, Site};

use crate::error::ProbeFault;
use crate::probe;
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const AD_IFRAME: &str = "iframe[src*=\"imasdk.googleapis.com\"]";
const AD_CLICK_ELEMENT: &str = "[data-role=\"adClickEl\"]";
const AD_CONTAINER: &str = "[data-role=\"adContainer\"]";
const AD_COUNTDOWN: &str = ".ad-info-manager-circular-loader-copy";

const VISUAL_MARKERS: &[&str] = &[
    ".ad-container",
    ".ad-overlay",
    ".ad-banner",
    "[data-testid=\"ad-overlay\"]",
    "[data-testid=\"ad-banner\"]",
    ".video-player__overlay--ad-playing",
    ".ad-persistent-player",
    ".ad-ui-view",
    "[data-purpose=\"ad-banner\"]",
    "[data-purpose=\"ad-container\"]",
    ".ad-player-overlay",
    ".ad-playback-progress",
    ".video-ad-overlay",
];

#[derive(Debug, Clone, Default)]
pub struct ParamountProfile;

impl ParamountProfile {
    pub fn new() -> Self {
        Self
    }
}

impl SiteProfile for ParamountProfile {
    fn site(&self) -> Site {
        Site::Paramount
    }

    fn player_selector(&self) -> &'static str {
        "#video-player"
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(250)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::confirmed(2)
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ad_iframe = probe::is_shown(page, AD_IFRAME)?;
        let ad_click_element = probe::is_shown(page, AD_CLICK_ELEMENT)?;
        // Only `display` counts here; a visibility-hidden container with
        // content still means an ad is loaded.
        let ad_container = probe::query(page, AD_CONTAINER)?
            .is_some_and(|el| el.display != "none" && el.has_content());
        let countdown = probe::countdown(page, AD_COUNTDOWN, true)?.filter(|secs| *secs > 0);
        let visual_markers = probe::any_shown_with_content(page, VISUAL_MARKERS)?;

        let detected = ad_iframe
            || ad_click_element
            || ad_container
            || (countdown.is_some() && visual_markers);

        Ok(AdSignal::new()
            .flag("ad_iframe", ad_iframe)
            .flag("ad_click_element", ad_click_element)
            .flag("ad_container", ad_container)
            .flag("ad_countdown", countdown.is_some())
            .number("countdown_seconds", countdown.map(|secs| secs as f64))
            .flag("visual_markers", visual_markers)
            .with_detected(detected))
    }
}
