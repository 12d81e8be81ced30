//! Mutation watcher.
//!
//! Merges three wake-up sources into one re-evaluation trigger stream:
//! mutations below the player container, a periodic timer, and container
//! discovery retries while the container is missing. Bursts of mutations
//! collapse into a single trigger.

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use admuter_protocols::{MutationKind, MutationRecord, MutationStream, ObserveOptions, Page, PageError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::profile::SiteProfile;

/// Pending triggers beyond this are dropped; one queued evaluation covers them.
const TRIGGER_BUFFER: usize = 4;

/// Why a re-evaluation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reevaluate {
    Mutation(MutationKind),
    Timer,
}

/// Where and how to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub container: String,
    pub fallback: Option<String>,
    pub options: ObserveOptions,
    pub interval: Duration,
    pub discovery_retry: Duration,
}

impl WatchTarget {
    pub fn for_profile<P: SiteProfile + ?Sized>(profile: &P, discovery_retry: Duration) -> Self {
        Self {
            container: profile.player_selector().to_string(),
            fallback: profile.container_fallback().map(str::to_string),
            options: profile.observe_options(),
            interval: profile.periodic_interval(),
            discovery_retry,
        }
    }
}

/// Spawns the watch task for one detector.
pub struct MutationWatcher {
    page: Arc<dyn Page>,
    target: WatchTarget,
}

impl MutationWatcher {
    pub fn new(page: Arc<dyn Page>, target: WatchTarget) -> Self {
        Self { page, target }
    }

    /// Start watching. Triggers arrive on the returned receiver until the
    /// handle is stopped or dropped.
    pub fn spawn(self) -> (WatcherHandle, mpsc::Receiver<Reevaluate>) {
        let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(self.page, self.target, tx, cancel.clone()));
        (WatcherHandle { cancel, task }, rx)
    }
}

/// Owner of a running watch task.
///
/// Stopping disconnects the observer and cancels the timer; no trigger is
/// sent after `stop` returns.
pub struct WatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn watch_loop(
    page: Arc<dyn Page>,
    target: WatchTarget,
    tx: mpsc::Sender<Reevaluate>,
    cancel: CancellationToken,
) {
    let start = Instant::now();
    let mut ticker = time::interval_at(start + target.interval, target.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let discovery = time::sleep_until(start);
    tokio::pin!(discovery);
    let mut stream: Option<MutationStream> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            record = next_record(&mut stream) => match record {
                Some(record) => {
                    let coalesced = stream.as_mut().map(MutationStream::drain).unwrap_or(0);
                    debug!("Mutation on {} (+{} coalesced)", record.target, coalesced);
                    if !forward(&tx, Reevaluate::Mutation(record.kind)) {
                        break;
                    }
                }
                None => {
                    debug!("Observed container went away, rediscovering");
                    stream = None;
                    discovery.as_mut().reset(Instant::now());
                }
            },

            _ = ticker.tick() => {
                if !forward(&tx, Reevaluate::Timer) {
                    break;
                }
            }

            _ = &mut discovery, if stream.is_none() => {
                match discover(page.as_ref(), &target) {
                    Ok(Some(found)) => stream = Some(found),
                    Ok(None) => {
                        debug!("Player container not found, will retry");
                        discovery.as_mut().reset(Instant::now() + target.discovery_retry);
                    }
                    Err(e) => {
                        warn!("Failed to observe player container: {}", e);
                        discovery.as_mut().reset(Instant::now() + target.discovery_retry);
                    }
                }
            }
        }
    }

    debug!("Mutation watcher stopped");
}

async fn next_record(stream: &mut Option<MutationStream>) -> Option<MutationRecord> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Queue a trigger. Returns `false` once the detector stopped listening.
fn forward(tx: &mpsc::Sender<Reevaluate>, trigger: Reevaluate) -> bool {
    match tx.try_send(trigger) {
        Ok(()) | Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Closed(_)) => false,
    }
}

fn discover(page: &dyn Page, target: &WatchTarget) -> Result<Option<MutationStream>, PageError> {
    if let Some(stream) = page.observe(&target.container, target.options)? {
        info!("Player container {} found, observing", target.container);
        return Ok(Some(stream));
    }
    if let Some(fallback) = &target.fallback {
        if let Some(stream) = page.observe(fallback, target.options)? {
            info!(
                "Player container {} missing, observing {} instead",
                target.container, fallback
            );
            return Ok(Some(stream));
        }
    }
    Ok(None)
}
