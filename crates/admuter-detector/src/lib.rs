//! # AdMuter Detector
//!
//! Infers "an ad is playing" from page DOM signals and keeps the tab muted
//! for exactly that long.
//!
//! ## Pipeline
//!
//! ```text
//!  MutationWatcher ──Reevaluate──▶ SiteProfile::evaluate ──AdSignal──▶ AdPresenceEstimator
//!  (mutations + timer)              (probe helpers)                     (confirmation threshold)
//!                                                                              │
//!                                                              AdStarted / AdEnded
//!                                                                              ▼
//!  ReconnectionSupervisor ◀──faults── MuteCoordinator ──Request──▶ AuthorityChannel
//! ```
//!
//! One [`Detector`] exists per (tab, site). It owns every piece above and
//! runs them sequentially inside a single task, so the estimator and the
//! coordinator never observe concurrent updates.
//!
//! ## Key Components
//!
//! - [`SiteProfile`]: site-specific selectors, signal rule and tuning
//! - [`AdPresenceEstimator`]: debounced Idle/Confirming/AdActive state machine
//! - [`MutationWatcher`]: merges DOM mutations and a periodic timer into one trigger
//! - [`MuteCoordinator`]: paired mute/unmute requests with local mute state
//! - [`ReconnectionSupervisor`]: error ceiling, invalidation restart and startup retry
//! - [`Detector`]: the per-tab instance and its run loop

pub mod coordinator;
pub mod detector;
mod detector_cycle;
mod detector_lifecycle;
pub mod error;
pub mod estimator;
pub mod memory_page;
pub mod probe;
pub mod profile;
pub mod signal;
pub mod sites;
pub mod supervisor;
pub mod watcher;

#[cfg(test)]
mod test_support;

pub use coordinator::MuteCoordinator;
pub use detector::{
    Detector, DetectorEvent, DetectorSettings, InstanceSnapshot, Lifecycle, StopReason,
};
pub use error::{DetectorFault, ProbeFault};
pub use estimator::{AdPresenceEstimator, AdTransition, EstimatorState, whole_seconds};
pub use memory_page::{MemoryPage, PageFrame, PageTimeline};
pub use profile::{ConfirmationPolicy, SiteProfile, Tuned};
pub use signal::{AdSignal, SignalValue};
pub use sites::{profile_for, tuned_profile};
pub use supervisor::{
    Backoff, ReconnectionSupervisor, RecoveryAction, RestartReason, RetryPolicy, SupervisorPolicy,
};
pub use watcher::{MutationWatcher, Reevaluate, WatchTarget, WatcherHandle};
