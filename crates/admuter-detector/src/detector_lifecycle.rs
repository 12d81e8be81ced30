//! Detector start/stop, enablement, fault recovery and scheduled wake-ups.

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::detector::{Detector, DetectorEvent, Lifecycle, StopReason, Wakeup};
use crate::error::DetectorFault;
use crate::estimator::{AdTransition, whole_seconds};
use crate::profile::SiteProfile;
use crate::supervisor::RecoveryAction;
use crate::watcher::{MutationWatcher, WatchTarget};

impl<P: SiteProfile> Detector<P> {
    /// Handshake with the authority: read the enablement flag and start
    /// detection if enabled. Failure enters the reconnect loop.
    pub async fn initialize(&mut self) {
        if !self.coordinator.channel_available() {
            warn!("{} messaging runtime not available", self.site());
            self.schedule_reconnect();
            self.schedule_unmute_retry();
            self.publish();
            return;
        }

        match self.coordinator.fetch_enabled().await {
            Ok(enabled) => {
                self.supervisor.connected();
                self.enabled = enabled;
                if enabled {
                    self.start_detection();
                } else {
                    info!("{} ad muter is disabled", self.site());
                    self.lifecycle = Lifecycle::Disabled;
                    self.flush_pending_unmute().await;
                }
            }
            Err(fault) => {
                warn!("{} failed to get initial state: {}", self.site(), fault);
                self.schedule_reconnect();
            }
        }
        self.schedule_unmute_retry();
        self.publish();
    }

    /// Spawn a fresh watcher, replacing any running one.
    pub fn start_detection(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.supervisor.resume();
        self.profile.reset();

        let target = WatchTarget::for_profile(&self.profile, self.settings.discovery_retry);
        let (handle, triggers) = MutationWatcher::new(self.page.clone(), target).spawn();
        self.watcher = Some(handle);
        self.triggers = Some(triggers);
        self.wakeup = None;
        // Evaluation cycles reconcile a pending unmute from here on
        self.unmute_retry = None;
        self.unmute_retries = 0;
        self.lifecycle = Lifecycle::Running;

        info!("{} ad detection initialized", self.site());
        self.emit(DetectorEvent::DetectionStarted { site: self.site() });
    }

    /// Stop the watcher and drop every queued trigger.
    ///
    /// No evaluation runs for this watcher once this returns.
    pub fn stop_detection(&mut self, reason: StopReason) {
        self.triggers = None;
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
            info!("{} ad detection stopped ({:?})", self.site(), reason);
            self.emit(DetectorEvent::DetectionStopped {
                site: self.site(),
                reason,
            });
        }
    }

    pub(crate) async fn set_enabled(&mut self, enabled: bool) {
        info!(
            "{} ad muter {}",
            self.site(),
            if enabled { "enabled" } else { "disabled" }
        );
        self.enabled = enabled;

        if enabled {
            // The push proves the authority is reachable.
            self.supervisor.connected();
            self.start_detection();
        } else {
            self.wakeup = None;
            self.halt(StopReason::Disabled).await;
            self.lifecycle = Lifecycle::Disabled;
            self.schedule_unmute_retry();
        }
        self.publish();
    }

    /// Page is going away: stop everything and give the tab its sound back.
    pub(crate) async fn shutdown(&mut self) {
        self.wakeup = None;
        self.unmute_retry = None;
        self.halt(StopReason::Unloaded).await;
        self.lifecycle = Lifecycle::Idle;
        self.publish();
    }

    /// Route a fault to the supervisor and carry out its decision.
    pub(crate) async fn handle_fault(&mut self, fault: DetectorFault) {
        warn!("{} detector fault: {}", self.site(), fault);
        self.emit(DetectorEvent::Fault {
            site: self.site(),
            kind: fault.kind(),
            message: fault.to_string(),
        });

        match self.supervisor.record_fault(&fault) {
            RecoveryAction::Continue => {}
            RecoveryAction::Restart { after, reason } => {
                self.halt(reason.into()).await;
                self.lifecycle = Lifecycle::CoolingDown;
                self.wakeup = Some((Instant::now() + after, Wakeup::Restart));
                info!("{} ad detection restarts in {:?}", self.site(), after);
            }
            RecoveryAction::Reconnect => {
                self.halt(StopReason::RuntimeUnavailable).await;
                self.schedule_reconnect();
            }
        }
        self.schedule_unmute_retry();
    }

    /// Run the unmute retry and the scheduled restart or reconnect attempt
    /// if they are due.
    ///
    /// Returns whether anything ran.
    pub async fn fire_due_wakeup(&mut self) -> bool {
        let now = Instant::now();
        let mut fired = false;

        if self.unmute_retry.is_some_and(|at| at <= now) {
            self.unmute_retry = None;
            self.flush_pending_unmute().await;
            self.schedule_unmute_retry();
            fired = true;
        }

        if let Some((at, wakeup)) = self.wakeup {
            if at <= now {
                self.wakeup = None;
                match wakeup {
                    Wakeup::Restart => {
                        info!("{} attempting to re-enable ad detection", self.site());
                        self.initialize().await;
                    }
                    Wakeup::Reconnect => self.attempt_reconnect().await,
                }
                fired = true;
            }
        }

        if fired {
            self.publish();
        }
        fired
    }

    async fn attempt_reconnect(&mut self) {
        if !self.coordinator.channel_available() {
            debug!("{} runtime still not available, retrying", self.site());
            self.schedule_reconnect();
            return;
        }

        match self.coordinator.ping().await {
            Ok(()) => {
                info!("{} reconnected to extension", self.site());
                self.initialize().await;
            }
            Err(fault) => {
                debug!("{} reconnection failed, retrying: {}", self.site(), fault);
                self.schedule_reconnect();
            }
        }
    }

    /// Claim the next reconnect attempt, or give up for this session.
    pub(crate) fn schedule_reconnect(&mut self) {
        let site = self.site();
        match self.supervisor.next_reconnect_delay() {
            Some(delay) => {
                let attempt = self.supervisor.reconnect_attempts();
                info!(
                    "{} attempting to reconnect to extension (attempt {}) in {:?}",
                    site, attempt, delay
                );
                self.lifecycle = Lifecycle::Reconnecting;
                self.wakeup = Some((Instant::now() + delay, Wakeup::Reconnect));
                self.emit(DetectorEvent::Reconnecting {
                    site,
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                });
            }
            None => {
                let attempts = self.supervisor.reconnect_attempts();
                let fault = DetectorFault::ExhaustedRetries { attempts };
                error!("{} {}, please refresh the page", site, fault);
                self.lifecycle = Lifecycle::Exhausted;
                self.wakeup = None;
                self.emit(DetectorEvent::Fault {
                    site,
                    kind: fault.kind(),
                    message: fault.to_string(),
                });
                self.emit(DetectorEvent::Exhausted { site, attempts });
            }
        }
    }

    /// Stop detection and end any active ad with its paired unmute.
    async fn halt(&mut self, reason: StopReason) {
        self.stop_detection(reason);
        self.release_ad().await;
    }

    async fn release_ad(&mut self) {
        let Some(AdTransition::Ended { duration }) = self.estimator.force_end(Instant::now())
        else {
            return;
        };
        let site = self.site();
        let ad_duration = whole_seconds(duration);
        self.ad_started_at = None;
        self.emit(DetectorEvent::AdEnded {
            site,
            duration_secs: ad_duration,
        });

        match self.coordinator.unmute(ad_duration).await {
            Ok(true) => self.emit(DetectorEvent::Unmuted { site, ad_duration }),
            Ok(false) => {}
            Err(fault) => warn!("{} unmute after stop failed, will retry: {}", site, fault),
        }
    }

    /// Keep an unacknowledged unmute on a timer while no evaluation cycle
    /// runs to retry it.
    ///
    /// A cool-down retries at the invalidation restart cadence; any other
    /// paused state follows the reconnect backoff.
    pub(crate) fn schedule_unmute_retry(&mut self) {
        if self.coordinator.pending_unmute().is_none() {
            self.unmute_retry = None;
            self.unmute_retries = 0;
            return;
        }
        if matches!(self.lifecycle, Lifecycle::Running | Lifecycle::Idle)
            || self.unmute_retry.is_some()
        {
            return;
        }

        self.unmute_retries = self.unmute_retries.saturating_add(1);
        let policy = &self.settings.supervisor;
        let delay = if self.lifecycle == Lifecycle::CoolingDown {
            policy.invalidation_restart
        } else {
            policy.reconnect.backoff.delay_for_attempt(self.unmute_retries)
        };
        debug!(
            "{} retrying pending unmute (attempt {}) in {:?}",
            self.site(),
            self.unmute_retries,
            delay
        );
        self.unmute_retry = Some(Instant::now() + delay);
    }

    async fn flush_pending_unmute(&mut self) {
        let Some(ad_duration) = self.coordinator.pending_unmute() else {
            return;
        };
        match self.coordinator.reconcile(false).await {
            Ok(true) => self.emit(DetectorEvent::Unmuted {
                site: self.site(),
                ad_duration,
            }),
            Ok(false) => {}
            Err(fault) => warn!("{} pending unmute failed: {}", self.site(), fault),
        }
    }
}
