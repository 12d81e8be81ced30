//! The privileged side: tab muting, enablement and metrics.

use std::collections::HashSet;
use std::sync::Arc;

use admuter_protocols::{Delivery, PushMessage, Request, Response, TabId};
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::channel::LocalChannel;
use crate::error::AuthorityError;
use crate::format::format_time_saved;
use crate::store::{Settings, SettingsStore};
use crate::tabs::TabController;

#[cfg(test)]
#[path = "authority_tests.rs"]
mod tests;

/// Push inbox depth per registered tab.
pub const INBOX_CAPACITY: usize = 8;

/// Owns the enablement flag and the metrics, and mutes tabs on request.
///
/// Every read-modify-write of the stored settings happens while holding the
/// ledger lock, so concurrent unmutes from several tabs never lose a credit.
pub struct Authority {
    store: Arc<dyn SettingsStore>,
    tabs: Arc<dyn TabController>,
    ledger: Mutex<Ledger>,
    inboxes: DashMap<TabId, mpsc::Sender<Delivery>>,
}

/// Tabs with a successful mute that has not been paired with an unmute yet.
#[derive(Default)]
struct Ledger {
    muted: HashSet<TabId>,
}

impl Authority {
    pub fn new(store: Arc<dyn SettingsStore>, tabs: Arc<dyn TabController>) -> Self {
        Self {
            store,
            tabs,
            ledger: Mutex::new(Ledger::default()),
            inboxes: DashMap::new(),
        }
    }

    /// Write the first-run defaults, discarding anything stored.
    pub async fn install(&self) -> Result<(), AuthorityError> {
        let _ledger = self.ledger.lock().await;
        self.store.save(&Settings::default()).await?;
        info!("AdMuter installed with default settings");
        Ok(())
    }

    pub async fn settings(&self) -> Result<Settings, AuthorityError> {
        self.store.load().await
    }

    /// Register a tab's push inbox, replacing an earlier one.
    pub fn register(&self, tab: TabId, inbox: mpsc::Sender<Delivery>) {
        if self.inboxes.insert(tab, inbox).is_some() {
            debug!("Replaced push inbox for {}", tab);
        }
    }

    pub fn unregister(&self, tab: TabId) -> bool {
        self.inboxes.remove(&tab).is_some()
    }

    pub fn registered_tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.inboxes.iter().map(|e| *e.key()).collect();
        tabs.sort();
        tabs
    }

    /// Register `tab` and hand back the channel its detector talks through,
    /// plus the inbox the detector's run loop reads pushes from.
    pub fn connect(self: &Arc<Self>, tab: TabId) -> (LocalChannel, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.register(tab, tx);
        (LocalChannel::new(self.clone(), Some(tab)), rx)
    }

    /// Answer one request. `sender` is the tab the request came from, if any.
    pub async fn handle(&self, sender: Option<TabId>, request: Request) -> Response {
        debug!("Authority received {} from {:?}", request.action(), sender);
        match request {
            Request::MuteTab => ack(self.mute(sender).await),
            Request::UnmuteTab { ad_duration } => ack(self.unmute(sender, ad_duration).await),
            Request::GetAdMuterState => match self.store.load().await {
                Ok(settings) => Response::state(settings.ad_muter_enabled),
                Err(e) => {
                    warn!("Failed to read enablement: {}", e);
                    Response::failure(e.to_string())
                }
            },
            Request::GetMetrics => match self.store.load().await {
                Ok(settings) => {
                    Response::metrics(settings.ads_muted, format_time_saved(settings.seconds_saved))
                }
                Err(e) => {
                    warn!("Failed to read metrics: {}", e);
                    Response::failure(e.to_string())
                }
            },
            Request::Ping => Response::ok(),
            Request::SetAdMuterState { enabled } => {
                ack(self.set_enabled(enabled).await.map(|_| ()))
            }
        }
    }

    async fn mute(&self, sender: Option<TabId>) -> Result<(), AuthorityError> {
        let tab = sender.ok_or(AuthorityError::NoTab)?;
        if let Err(e) = self.tabs.set_muted(tab, true).await {
            warn!("Failed to mute {}: {}", tab, e);
            return Err(e);
        }

        self.ledger.lock().await.muted.insert(tab);
        info!("Muted {}", tab);
        Ok(())
    }

    async fn unmute(&self, sender: Option<TabId>, ad_duration: u64) -> Result<(), AuthorityError> {
        let tab = sender.ok_or(AuthorityError::NoTab)?;
        if let Err(e) = self.tabs.set_muted(tab, false).await {
            warn!("Failed to unmute {}: {}", tab, e);
            return Err(e);
        }
        info!("Unmuted {}", tab);

        let mut ledger = self.ledger.lock().await;
        if !ledger.muted.remove(&tab) {
            debug!("{} had no recorded mute, metrics unchanged", tab);
            return Ok(());
        }

        // The tab is already unmuted; a lost credit must not fail the reply
        if let Err(e) = self.credit(ad_duration).await {
            warn!("Failed to update metrics for {}: {}", tab, e);
        }
        Ok(())
    }

    /// Caller holds the ledger lock.
    async fn credit(&self, ad_duration: u64) -> Result<(), AuthorityError> {
        let mut settings = self.store.load().await?;
        settings.ads_muted += 1;
        settings.seconds_saved += ad_duration;
        self.store.save(&settings).await?;
        info!(
            "Metrics updated: adsMuted={} secondsSaved={}",
            settings.ads_muted, settings.seconds_saved
        );
        Ok(())
    }

    /// Persist the enablement flag and push it to every registered tab.
    ///
    /// Tabs that cannot receive are skipped. Returns how many acknowledged.
    pub async fn set_enabled(&self, enabled: bool) -> Result<usize, AuthorityError> {
        {
            let _ledger = self.ledger.lock().await;
            let mut settings = self.store.load().await?;
            settings.ad_muter_enabled = enabled;
            self.store.save(&settings).await?;
        }
        info!("AdMuter {}", if enabled { "enabled" } else { "disabled" });

        Ok(self.broadcast(PushMessage::UpdateAdMuterState { enabled }).await)
    }

    async fn broadcast(&self, message: PushMessage) -> usize {
        use futures::stream::{FuturesUnordered, StreamExt};

        // Clone the senders out so no map shard is locked across an await
        let targets: Vec<(TabId, mpsc::Sender<Delivery>)> = self
            .inboxes
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();

        let mut pending: FuturesUnordered<_> = targets
            .into_iter()
            .map(|(tab, inbox)| {
                let message = message.clone();
                async move {
                    let (delivery, reply) = Delivery::new(message);
                    if inbox.send(delivery).await.is_err() {
                        return (tab, false);
                    }
                    let acked = matches!(reply.await, Ok(r) if r.as_ack().is_some_and(|a| a.success));
                    (tab, acked)
                }
            })
            .collect();

        let mut acknowledged = 0;
        while let Some((tab, acked)) = pending.next().await {
            if acked {
                acknowledged += 1;
            } else {
                debug!("{} did not take the update", tab);
                self.inboxes.remove_if(&tab, |_, inbox| inbox.is_closed());
            }
        }

        self.forget_departed_tabs().await;
        acknowledged
    }

    /// Drop ledger entries of tabs whose detector is gone without unmuting.
    ///
    /// An unregistered tab keeps its entry until here so the unmute its
    /// detector sends while shutting down is still credited.
    async fn forget_departed_tabs(&self) {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.muted.len();
        ledger.muted.retain(|tab| self.inboxes.contains_key(tab));
        let forgotten = before - ledger.muted.len();
        if forgotten > 0 {
            debug!("Forgot {} unpaired mutes of departed tabs", forgotten);
        }
    }
}

fn ack(result: Result<(), AuthorityError>) -> Response {
    match result {
        Ok(()) => Response::ok(),
        Err(e) => Response::failure(e.to_string()),
    }
}
