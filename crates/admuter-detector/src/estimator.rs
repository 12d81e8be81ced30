//! Ad presence estimator.
//!
//! Debounces the per-cycle verdict into ad start and end transitions.
//!
//! ```text
//!            detected (count < threshold)
//!   Idle ─────────────────────────────▶ Confirming
//!    ▲  ◀──────── not detected ────────────┘ │
//!    │                                       │ detected (count == threshold)
//!    │        not detected × release         ▼
//!    └──────────────────────────────────  AdActive
//! ```
//!
//! `Started` and `Ended` strictly alternate: there is no way to reach
//! `Ended` without a preceding `Started`.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::profile::ConfirmationPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorState {
    /// No evidence.
    Idle,
    /// Positive cycles seen, threshold not reached yet.
    Confirming,
    /// An ad is considered playing.
    AdActive,
}

/// Edge emitted when the ad state flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdTransition {
    Started,
    Ended { duration: Duration },
}

/// Round to whole seconds, halves up.
pub fn whole_seconds(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    u64::try_from((millis + 500) / 1000).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone)]
pub struct AdPresenceEstimator {
    policy: ConfirmationPolicy,
    state: EstimatorState,
    confirmations: u32,
    misses: u32,
    started_at: Option<Instant>,
}

impl AdPresenceEstimator {
    pub fn new(policy: ConfirmationPolicy) -> Self {
        Self {
            policy: policy.normalized(),
            state: EstimatorState::Idle,
            confirmations: 0,
            misses: 0,
            started_at: None,
        }
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EstimatorState::AdActive
    }

    /// Consecutive positive cycles so far.
    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Feed one cycle's verdict.
    pub fn observe(&mut self, detected: bool, now: Instant) -> Option<AdTransition> {
        match (self.state, detected) {
            (EstimatorState::Idle | EstimatorState::Confirming, true) => {
                self.confirmations = self.confirmations.saturating_add(1);
                if self.confirmations >= self.policy.threshold {
                    self.state = EstimatorState::AdActive;
                    self.started_at = Some(now);
                    self.misses = 0;
                    Some(AdTransition::Started)
                } else {
                    self.state = EstimatorState::Confirming;
                    None
                }
            }
            (EstimatorState::Idle | EstimatorState::Confirming, false) => {
                self.confirmations = 0;
                self.state = EstimatorState::Idle;
                None
            }
            (EstimatorState::AdActive, true) => {
                self.confirmations = self.confirmations.saturating_add(1);
                self.misses = 0;
                None
            }
            (EstimatorState::AdActive, false) => {
                self.misses += 1;
                if self.misses >= self.policy.release_threshold {
                    self.end(now)
                } else {
                    None
                }
            }
        }
    }

    /// End an active ad regardless of evidence (detection disabled or stopped).
    pub fn force_end(&mut self, now: Instant) -> Option<AdTransition> {
        if self.is_active() {
            self.end(now)
        } else {
            self.reset();
            None
        }
    }

    /// Back to `Idle`, dropping any active ad without a transition.
    pub fn reset(&mut self) {
        self.state = EstimatorState::Idle;
        self.confirmations = 0;
        self.misses = 0;
        self.started_at = None;
    }

    fn end(&mut self, now: Instant) -> Option<AdTransition> {
        let duration = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        self.reset();
        Some(AdTransition::Ended { duration })
    }
}

#[cfg(test)]
#[path = "estimator_tests.rs"]
mod tests;
