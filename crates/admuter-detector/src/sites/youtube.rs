//! YouTube: overlay plus corroborating ad UI, with skip assistance.

use std::time::Duration;

use admuter_protocols::{ObserveOptions, Page, Site};

use crate::error::ProbeFault;
use crate::probe;
use crate::profile::{ConfirmationPolicy, SiteProfile};
use crate::signal::AdSignal;

const AD_OVERLAY: &[&str] = &[".ytp-ad-player-overlay", ".video-ads.ytp-ad-module"];

const SKIP_BUTTON: &[&str] = &[
    ".ytp-ad-skip-button",
    ".videoAdUiSkipButton",
    "[id^=\"skip-button\"]",
    ".ytp-ad-skip-button-modern",
];

const AD_TEXT: &[&str] = &[".ytp-ad-text", ".videoAdUiAttribution", ".ytp-ad-preview-text"];

const AD_DISPLAY_CONTAINER: &[&str] = &[".ad-showing", ".ytp-ad-overlay-container"];

/// An ad is the overlay together with a skip button, ad text or the
/// ad display container.
#[derive(Debug, Clone, Default)]
pub struct YouTubeProfile;

impl YouTubeProfile {
    pub fn new() -> Self {
        Self
    }
}

impl SiteProfile for YouTubeProfile {
    fn site(&self) -> Site {
        Site::YouTube
    }

    fn player_selector(&self) -> &'static str {
        "#player-container"
    }

    fn observe_options(&self) -> ObserveOptions {
        ObserveOptions::TREE
    }

    fn periodic_interval(&self) -> Duration {
        Duration::from_millis(1000)
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::IMMEDIATE
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        let ad_overlay = probe::any_present(page, AD_OVERLAY)?;
        let skip_button = probe::any_present(page, SKIP_BUTTON)?;
        let ad_text = probe::any_present(page, AD_TEXT)?;
        let ad_display_container = probe::any_present(page, AD_DISPLAY_CONTAINER)?;

        Ok(AdSignal::new()
            .flag("ad_overlay", ad_overlay)
            .flag("skip_button", skip_button)
            .flag("ad_text", ad_text)
            .flag("ad_display_container", ad_display_container)
            .with_detected(ad_overlay && (skip_button || ad_text || ad_display_container)))
    }

    fn skip_target(&self, page: &dyn Page) -> Result<Option<&'static str>, ProbeFault> {
        probe::first_rendered(page, SKIP_BUTTON)
    }
}
