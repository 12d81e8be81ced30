//! The per-tab detector instance.
//!
//! A [`Detector`] is created when a supported page loads and lives until
//! the page goes away. It owns one profile, one estimator, one coordinator,
//! one supervisor and at most one running watcher, and processes triggers,
//! pushes and scheduled wake-ups strictly one at a time.
//!
//! ```text
//!            initialize ok, enabled
//!   Idle ──────────────────────────▶ Running ◀─────────────┐
//!    │ │                              │    │                │ wake-up
//!    │ │ initialize ok, disabled      │    └─ fault ceiling ─▶ CoolingDown
//!    │ └──────────▶ Disabled ◀─ push ─┘       or invalidated
//!    │ startup failure                 │
//!    └──────────▶ Reconnecting ◀─ runtime unavailable
//!                     │ attempts used up
//!                     ▼
//!                 Exhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use admuter_config::Config;
use admuter_protocols::{AuthorityChannel, Delivery, Page, PushMessage, Response, Site};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::coordinator::MuteCoordinator;
use crate::estimator::AdPresenceEstimator;
use crate::profile::SiteProfile;
use crate::supervisor::{ReconnectionSupervisor, RestartReason, SupervisorPolicy};
use crate::watcher::{Reevaluate, WatcherHandle};

/// Skip clicks attempted per ad before giving up.
const MAX_SKIP_ATTEMPTS: u32 = 5;

const EVENT_BUFFER: usize = 64;

/// Runtime tuning for one detector.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub supervisor: SupervisorPolicy,
    /// Delay between player container lookups while it is missing.
    pub discovery_retry: Duration,
    pub max_skip_attempts: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            supervisor: SupervisorPolicy::default(),
            discovery_retry: Duration::from_millis(1000),
            max_skip_attempts: MAX_SKIP_ATTEMPTS,
        }
    }
}

impl From<&Config> for DetectorSettings {
    fn from(config: &Config) -> Self {
        Self {
            supervisor: SupervisorPolicy::from(&config.supervisor),
            discovery_retry: Duration::from_millis(config.watcher.discovery_retry_ms),
            max_skip_attempts: MAX_SKIP_ATTEMPTS,
        }
    }
}

/// Where the instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Not initialized yet, or unloaded.
    Idle,
    Running,
    /// Detection paused until a scheduled restart.
    CoolingDown,
    /// Waiting for the next reconnect attempt.
    Reconnecting,
    /// Reconnect attempts used up; only a reload helps.
    Exhausted,
    /// The user turned the ad muter off.
    Disabled,
}

/// Why detection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Disabled,
    ErrorCeiling,
    ContextInvalidated,
    RuntimeUnavailable,
    Unloaded,
}

impl From<RestartReason> for StopReason {
    fn from(reason: RestartReason) -> Self {
        match reason {
            RestartReason::ErrorCeiling => StopReason::ErrorCeiling,
            RestartReason::ContextInvalidated => StopReason::ContextInvalidated,
        }
    }
}

/// Observable state of one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub site: Site,
    pub lifecycle: Lifecycle,
    pub enabled: bool,
    pub ad_playing: bool,
    pub muted: bool,
    pub consecutive_confirmations: u32,
    /// Set exactly while `ad_playing`.
    pub ad_started_at: Option<DateTime<Utc>>,
    pub error_count: u32,
    pub reconnect_attempts: u32,
}

/// Notable things that happened inside an instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DetectorEvent {
    DetectionStarted { site: Site },
    DetectionStopped { site: Site, reason: StopReason },
    AdStarted { site: Site, at: DateTime<Utc> },
    AdEnded { site: Site, duration_secs: u64 },
    Muted { site: Site },
    Unmuted { site: Site, ad_duration: u64 },
    SkipAttempted { site: Site, attempt: u32 },
    Fault { site: Site, kind: &'static str, message: String },
    Reconnecting { site: Site, attempt: u32, delay_ms: u64 },
    Exhausted { site: Site, attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wakeup {
    Restart,
    Reconnect,
}

/// One detector instance for one (tab, site).
pub struct Detector<P: SiteProfile> {
    pub(crate) profile: P,
    pub(crate) page: Arc<dyn Page>,
    pub(crate) coordinator: MuteCoordinator,
    pub(crate) estimator: AdPresenceEstimator,
    pub(crate) supervisor: ReconnectionSupervisor,
    pub(crate) settings: DetectorSettings,
    pub(crate) enabled: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) watcher: Option<WatcherHandle>,
    pub(crate) triggers: Option<mpsc::Receiver<Reevaluate>>,
    pub(crate) wakeup: Option<(Instant, Wakeup)>,
    /// Next retry of an unacknowledged unmute while no cycle runs.
    pub(crate) unmute_retry: Option<Instant>,
    pub(crate) unmute_retries: u32,
    pub(crate) ad_started_at: Option<DateTime<Utc>>,
    pub(crate) skip_attempts: u32,
    events: broadcast::Sender<DetectorEvent>,
    state: watch::Sender<InstanceSnapshot>,
}

impl<P: SiteProfile> Detector<P> {
    pub fn new(
        profile: P,
        page: Arc<dyn Page>,
        channel: Arc<dyn AuthorityChannel>,
        settings: DetectorSettings,
    ) -> Self {
        let estimator = AdPresenceEstimator::new(profile.confirmation());
        let supervisor = ReconnectionSupervisor::new(settings.supervisor);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (state, _) = watch::channel(InstanceSnapshot {
            site: profile.site(),
            lifecycle: Lifecycle::Idle,
            enabled: false,
            ad_playing: false,
            muted: false,
            consecutive_confirmations: 0,
            ad_started_at: None,
            error_count: 0,
            reconnect_attempts: 0,
        });

        Self {
            profile,
            page,
            coordinator: MuteCoordinator::new(channel),
            estimator,
            supervisor,
            settings,
            enabled: false,
            lifecycle: Lifecycle::Idle,
            watcher: None,
            triggers: None,
            wakeup: None,
            unmute_retry: None,
            unmute_retries: 0,
            ad_started_at: None,
            skip_attempts: 0,
            events,
            state,
        }
    }

    pub fn site(&self) -> Site {
        self.profile.site()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// When the next scheduled restart, reconnect attempt or unmute retry
    /// is due.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.wakeup.map(|(at, _)| at), self.unmute_retry) {
            (Some(scheduled), Some(retry)) => Some(scheduled.min(retry)),
            (scheduled, retry) => scheduled.or(retry),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectorEvent> {
        self.events.subscribe()
    }

    /// Live view of [`snapshot`](Self::snapshot), updated after every step.
    pub fn watch_state(&self) -> watch::Receiver<InstanceSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            site: self.site(),
            lifecycle: self.lifecycle,
            enabled: self.enabled,
            ad_playing: self.estimator.is_active(),
            muted: self.coordinator.is_muted(),
            consecutive_confirmations: self.estimator.confirmations(),
            ad_started_at: self.ad_started_at,
            error_count: self.supervisor.error_count(),
            reconnect_attempts: self.supervisor.reconnect_attempts(),
        }
    }

    /// Answer a push from the authority.
    pub async fn handle_push(&mut self, message: PushMessage) -> Response {
        match message {
            PushMessage::UpdateAdMuterState { enabled } => {
                self.set_enabled(enabled).await;
                Response::ok()
            }
        }
    }

    /// Drive the instance until the authority drops its push sender.
    ///
    /// Returns the final state after detection was torn down.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<Delivery>) -> InstanceSnapshot {
        info!("{} content script loaded", self.site());
        self.initialize().await;

        loop {
            let deadline = self.next_wakeup();
            tokio::select! {
                delivery = inbox.recv() => match delivery {
                    Some(delivery) => {
                        let response = self.handle_push(delivery.message.clone()).await;
                        delivery.respond(response);
                    }
                    None => break,
                },
                Some(trigger) = next_trigger(&mut self.triggers) => {
                    self.evaluate(trigger).await;
                }
                _ = sleep_until_deadline(deadline) => {
                    self.fire_due_wakeup().await;
                }
            }
        }

        debug!("{} detector inbox closed", self.site());
        self.shutdown().await;
        self.snapshot()
    }

    pub(crate) fn emit(&self, event: DetectorEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn publish(&self) {
        self.state.send_replace(self.snapshot());
    }
}

async fn next_trigger(triggers: &mut Option<mpsc::Receiver<Reevaluate>>) -> Option<Reevaluate> {
    match triggers {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
