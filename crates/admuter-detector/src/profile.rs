//! Site profile abstraction.
//!
//! A profile supplies everything that varies per streaming site: where to
//! watch, how often to poll, which DOM evidence means "ad", and how much
//! confirmation the evidence needs. Everything downstream of the signal is
//! shared.

use std::time::Duration;

use admuter_config::SiteConfig;
use admuter_protocols::{ObserveOptions, Page, Site};

use crate::error::ProbeFault;
use crate::signal::AdSignal;

/// How many consecutive cycles must agree before the ad state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Positive cycles needed to enter `AdActive`.
    pub threshold: u32,
    /// Negative cycles needed to leave `AdActive`.
    pub release_threshold: u32,
}

impl ConfirmationPolicy {
    /// Start and end on the first agreeing cycle.
    pub const IMMEDIATE: ConfirmationPolicy = ConfirmationPolicy {
        threshold: 1,
        release_threshold: 1,
    };

    /// Require `threshold` positives to start, release on the first negative.
    pub fn confirmed(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            release_threshold: 1,
        }
    }

    /// Clamp both thresholds to at least one cycle.
    pub fn normalized(self) -> Self {
        Self {
            threshold: self.threshold.max(1),
            release_threshold: self.release_threshold.max(1),
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::IMMEDIATE
    }
}

/// Site-specific detection knowledge.
pub trait SiteProfile: Send {
    fn site(&self) -> Site;

    /// Preferred mutation-observation root.
    fn player_selector(&self) -> &'static str;

    /// Root to use while the player container is missing.
    fn container_fallback(&self) -> Option<&'static str> {
        Some("body")
    }

    fn observe_options(&self) -> ObserveOptions {
        ObserveOptions::ALL
    }

    /// Timer-driven re-evaluation period.
    fn periodic_interval(&self) -> Duration;

    fn confirmation(&self) -> ConfirmationPolicy;

    /// Collect this cycle's signals and apply the site rule.
    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault>;

    /// Clickable control that ends the current ad early, if visible.
    fn skip_target(&self, _page: &dyn Page) -> Result<Option<&'static str>, ProbeFault> {
        Ok(None)
    }

    /// Forget cross-cycle state (playhead baselines and the like).
    fn reset(&mut self) {}
}

impl SiteProfile for Box<dyn SiteProfile> {
    fn site(&self) -> Site {
        (**self).site()
    }

    fn player_selector(&self) -> &'static str {
        (**self).player_selector()
    }

    fn container_fallback(&self) -> Option<&'static str> {
        (**self).container_fallback()
    }

    fn observe_options(&self) -> ObserveOptions {
        (**self).observe_options()
    }

    fn periodic_interval(&self) -> Duration {
        (**self).periodic_interval()
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        (**self).confirmation()
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        (**self).evaluate(page)
    }

    fn skip_target(&self, page: &dyn Page) -> Result<Option<&'static str>, ProbeFault> {
        (**self).skip_target(page)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// A profile with thresholds and interval overridden from configuration.
#[derive(Debug, Clone)]
pub struct Tuned<P> {
    inner: P,
    threshold: Option<u32>,
    release_threshold: Option<u32>,
    interval: Option<Duration>,
}

impl<P: SiteProfile> Tuned<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            threshold: None,
            release_threshold: None,
            interval: None,
        }
    }

    /// Apply the overrides present in a `[sites.<key>]` table.
    pub fn from_config(inner: P, config: Option<&SiteConfig>) -> Self {
        let mut tuned = Self::new(inner);
        if let Some(config) = config {
            tuned.threshold = config.confirmation_threshold;
            tuned.release_threshold = config.release_threshold;
            tuned.interval = config.interval_ms.map(Duration::from_millis);
        }
        tuned
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_release_threshold(mut self, release_threshold: u32) -> Self {
        self.release_threshold = Some(release_threshold);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: SiteProfile> SiteProfile for Tuned<P> {
    fn site(&self) -> Site {
        self.inner.site()
    }

    fn player_selector(&self) -> &'static str {
        self.inner.player_selector()
    }

    fn container_fallback(&self) -> Option<&'static str> {
        self.inner.container_fallback()
    }

    fn observe_options(&self) -> ObserveOptions {
        self.inner.observe_options()
    }

    fn periodic_interval(&self) -> Duration {
        self.interval
            .unwrap_or_else(|| self.inner.periodic_interval())
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        let base = self.inner.confirmation();
        ConfirmationPolicy {
            threshold: self.threshold.unwrap_or(base.threshold),
            release_threshold: self.release_threshold.unwrap_or(base.release_threshold),
        }
        .normalized()
    }

    fn evaluate(&mut self, page: &dyn Page) -> Result<AdSignal, ProbeFault> {
        self.inner.evaluate(page)
    }

    fn skip_target(&self, page: &dyn Page) -> Result<Option<&'static str>, ProbeFault> {
        self.inner.skip_target(page)
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::TwitchProfile;

    #[test]
    fn test_confirmed_clamps_to_one() {
        let policy = ConfirmationPolicy::confirmed(0);
        assert_eq!(policy.threshold, 1);
        assert_eq!(policy.release_threshold, 1);
    }

    #[test]
    fn test_tuned_without_overrides_delegates() {
        let tuned = Tuned::new(TwitchProfile::new());
        assert_eq!(tuned.confirmation(), ConfirmationPolicy::IMMEDIATE);
        assert_eq!(tuned.periodic_interval(), Duration::from_millis(500));
        assert_eq!(tuned.site(), Site::Twitch);
    }

    #[test]
    fn test_tuned_from_config() {
        let config = SiteConfig {
            enabled: true,
            confirmation_threshold: Some(4),
            release_threshold: Some(2),
            interval_ms: Some(750),
        };
        let tuned = Tuned::from_config(TwitchProfile::new(), Some(&config));
        assert_eq!(tuned.confirmation().threshold, 4);
        assert_eq!(tuned.confirmation().release_threshold, 2);
        assert_eq!(tuned.periodic_interval(), Duration::from_millis(750));
    }

    #[test]
    fn test_tuned_zero_threshold_is_normalized() {
        let tuned = Tuned::new(TwitchProfile::new()).with_threshold(0);
        assert_eq!(tuned.confirmation().threshold, 1);
    }

    #[test]
    fn test_boxed_profile_delegates() {
        let boxed: Box<dyn SiteProfile> = Box::new(TwitchProfile::new());
        assert_eq!(boxed.player_selector(), ".video-player");
        assert_eq!(boxed.container_fallback(), Some("body"));
    }
}
