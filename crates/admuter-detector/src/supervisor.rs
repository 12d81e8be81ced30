//! Reconnection supervisor.
//!
//! Three failure modes, three recovery paths:
//!
//! - routine faults count toward an error ceiling; reaching it stops
//!   detection for a long cool-down, then restarts from scratch
//! - channel invalidation restarts after a short fixed delay, regardless
//!   of the error count
//! - an unavailable runtime (typically at startup) enters a bounded
//!   reconnect loop that pings the authority before re-initializing
//!
//! The supervisor only decides; the detector carries the decisions out.

use std::time::Duration;

use admuter_config::{BackoffKind, SupervisorConfig};
use admuter_protocols::ChannelError;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DetectorFault;

/// Delay schedule for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every attempt.
    Fixed(Duration),
    /// `step * attempt`.
    Linear(Duration),
}

impl Backoff {
    /// Delay before the given 1-based attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Linear(step) => step.saturating_mul(attempt.max(1)),
        }
    }
}

/// Retry configuration for the reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Fixed(Duration::from_millis(2000)),
        }
    }
}

/// Supervisor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorPolicy {
    /// Routine faults tolerated before the cool-down.
    pub max_errors: u32,
    pub error_cooldown: Duration,
    /// Restart delay after the channel was invalidated.
    pub invalidation_restart: Duration,
    pub reconnect: RetryPolicy,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            max_errors: 5,
            error_cooldown: Duration::from_millis(60_000),
            invalidation_restart: Duration::from_millis(1000),
            reconnect: RetryPolicy::default(),
        }
    }
}

impl From<&SupervisorConfig> for SupervisorPolicy {
    fn from(config: &SupervisorConfig) -> Self {
        let interval = Duration::from_millis(config.reconnect.interval_ms);
        let backoff = match config.reconnect.backoff {
            BackoffKind::Fixed => Backoff::Fixed(interval),
            BackoffKind::Linear => Backoff::Linear(interval),
        };
        Self {
            max_errors: config.max_errors.max(1),
            error_cooldown: Duration::from_millis(config.error_cooldown_ms),
            invalidation_restart: Duration::from_millis(config.invalidation_restart_ms),
            reconnect: RetryPolicy {
                max_attempts: config.reconnect.max_attempts,
                backoff,
            },
        }
    }
}

/// Why detection is being restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    ErrorCeiling,
    ContextInvalidated,
}

/// What the detector should do about a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Keep detecting.
    Continue,
    /// Stop detection now and start it again after `after`.
    Restart {
        after: Duration,
        reason: RestartReason,
    },
    /// Stop detection and enter the reconnect loop.
    Reconnect,
}

#[derive(Debug, Clone)]
pub struct ReconnectionSupervisor {
    policy: SupervisorPolicy,
    error_count: u32,
    reconnect_attempts: u32,
    /// A restart or reconnect is already scheduled.
    recovering: bool,
}

impl ReconnectionSupervisor {
    pub fn new(policy: SupervisorPolicy) -> Self {
        Self {
            policy,
            error_count: 0,
            reconnect_attempts: 0,
            recovering: false,
        }
    }

    pub fn policy(&self) -> &SupervisorPolicy {
        &self.policy
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    /// Classify a fault. Faults arriving while a recovery is already
    /// scheduled are ignored.
    pub fn record_fault(&mut self, fault: &DetectorFault) -> RecoveryAction {
        if self.recovering {
            debug!("Ignoring fault during recovery: {}", fault);
            return RecoveryAction::Continue;
        }

        match fault {
            DetectorFault::ChannelInvalidated => {
                self.error_count += 1;
                self.recovering = true;
                warn!("Extension context invalidated, reloading ad detection");
                RecoveryAction::Restart {
                    after: self.policy.invalidation_restart,
                    reason: RestartReason::ContextInvalidated,
                }
            }
            DetectorFault::Channel(ChannelError::RuntimeUnavailable) => {
                self.recovering = true;
                RecoveryAction::Reconnect
            }
            DetectorFault::ExhaustedRetries { .. } => RecoveryAction::Continue,
            DetectorFault::Probe(_) | DetectorFault::Channel(_) => {
                self.error_count += 1;
                if self.error_count >= self.policy.max_errors {
                    self.recovering = true;
                    warn!("Max errors reached, disabling ad detection temporarily");
                    RecoveryAction::Restart {
                        after: self.policy.error_cooldown,
                        reason: RestartReason::ErrorCeiling,
                    }
                } else {
                    RecoveryAction::Continue
                }
            }
        }
    }

    /// A full evaluation cycle succeeded.
    pub fn record_success(&mut self) {
        self.error_count = 0;
    }

    /// Detection is (re)starting: clear the error count and recovery flag.
    pub fn resume(&mut self) {
        self.error_count = 0;
        self.recovering = false;
    }

    /// Claim the next reconnect attempt. `None` once attempts are exhausted.
    pub fn next_reconnect_delay(&mut self) -> Option<Duration> {
        if self.reconnect_attempts >= self.policy.reconnect.max_attempts {
            return None;
        }
        self.reconnect_attempts += 1;
        self.recovering = true;
        Some(
            self.policy
                .reconnect
                .backoff
                .delay_for_attempt(self.reconnect_attempts),
        )
    }

    /// The authority answered: the reconnect budget is restored.
    pub fn connected(&mut self) {
        self.reconnect_attempts = 0;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
