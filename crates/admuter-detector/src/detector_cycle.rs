//! One evaluation cycle: probe, estimate, coordinate, assist.

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::detector::{Detector, DetectorEvent, Lifecycle};
use crate::error::{DetectorFault, ProbeFault};
use crate::estimator::{AdTransition, whole_seconds};
use crate::profile::SiteProfile;
use crate::watcher::Reevaluate;

impl<P: SiteProfile> Detector<P> {
    /// Re-evaluate the page. Ignored unless detection is running.
    pub async fn evaluate(&mut self, trigger: Reevaluate) {
        if !self.enabled || self.lifecycle != Lifecycle::Running {
            return;
        }

        match self.run_cycle(trigger).await {
            Ok(()) => self.supervisor.record_success(),
            Err(fault) => self.handle_fault(fault).await,
        }
        self.publish();
    }

    async fn run_cycle(&mut self, trigger: Reevaluate) -> Result<(), DetectorFault> {
        let signal = self.profile.evaluate(self.page.as_ref())?;
        let transition = self.estimator.observe(signal.is_detected(), Instant::now());
        debug!(
            "{} ad check ({:?}): {} state={:?} confirmations={}",
            self.site(),
            trigger,
            signal,
            self.estimator.state(),
            self.estimator.confirmations()
        );

        match transition {
            Some(transition) => self.apply_transition(transition).await?,
            None => self.reconcile_mute().await?,
        }

        if self.estimator.is_active() {
            self.assist_skip()?;
        }
        Ok(())
    }

    async fn apply_transition(&mut self, transition: AdTransition) -> Result<(), DetectorFault> {
        let site = self.site();
        match transition {
            AdTransition::Started => {
                let at = Utc::now();
                self.ad_started_at = Some(at);
                self.skip_attempts = 0;
                info!("{} ad detected, attempting to mute tab", site);
                self.emit(DetectorEvent::AdStarted { site, at });

                self.coordinator.mute().await?;
                self.emit(DetectorEvent::Muted { site });
            }
            AdTransition::Ended { duration } => {
                let ad_duration = whole_seconds(duration);
                self.ad_started_at = None;
                info!("{} ad ended after {}s, attempting to unmute tab", site, ad_duration);
                self.emit(DetectorEvent::AdEnded {
                    site,
                    duration_secs: ad_duration,
                });

                if self.coordinator.unmute(ad_duration).await? {
                    self.emit(DetectorEvent::Unmuted { site, ad_duration });
                }
            }
        }
        Ok(())
    }

    /// Retry a mute or unmute that a previous cycle failed to deliver.
    async fn reconcile_mute(&mut self) -> Result<(), DetectorFault> {
        let active = self.estimator.is_active();
        let pending = self.coordinator.pending_unmute();
        if !self.coordinator.reconcile(active).await? {
            return Ok(());
        }

        let site = self.site();
        match (active, pending) {
            (true, _) => self.emit(DetectorEvent::Muted { site }),
            (false, Some(ad_duration)) => self.emit(DetectorEvent::Unmuted { site, ad_duration }),
            (false, None) => {}
        }
        Ok(())
    }

    /// Click a visible skip control, a bounded number of times per ad.
    fn assist_skip(&mut self) -> Result<(), DetectorFault> {
        if self.skip_attempts >= self.settings.max_skip_attempts {
            return Ok(());
        }
        let Some(selector) = self.profile.skip_target(self.page.as_ref())? else {
            return Ok(());
        };

        self.skip_attempts += 1;
        info!(
            "Skip button detected, attempting to skip (attempt {}/{})",
            self.skip_attempts, self.settings.max_skip_attempts
        );
        self.emit(DetectorEvent::SkipAttempted {
            site: self.site(),
            attempt: self.skip_attempts,
        });

        self.page
            .click(selector)
            .map_err(|source| ProbeFault::new(selector, source))?;
        Ok(())
    }
}
