//! Mute coordinator.
//!
//! Turns ad transitions into paired mute/unmute requests and keeps the
//! detector's view of the tab's mute state. A tab is only unmuted if this
//! coordinator muted it (or may have: a lost reply leaves the state
//! uncertain), and an unmute that could not be delivered is retried on the
//! next cycle.

use std::sync::Arc;

use admuter_protocols::{AuthorityChannel, ChannelError, Request, Response};
use tracing::{debug, info, warn};

use crate::error::DetectorFault;

pub struct MuteCoordinator {
    channel: Arc<dyn AuthorityChannel>,
    muted: bool,
    /// A mute request may have been applied without us seeing the reply.
    uncertain: bool,
    /// Ad duration of an unmute that has not been acknowledged yet.
    pending_unmute: Option<u64>,
}

impl MuteCoordinator {
    pub fn new(channel: Arc<dyn AuthorityChannel>) -> Self {
        Self {
            channel,
            muted: false,
            uncertain: false,
            pending_unmute: None,
        }
    }

    /// The authority acknowledged our last mute and no unmute since.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn pending_unmute(&self) -> Option<u64> {
        self.pending_unmute
    }

    pub fn channel_available(&self) -> bool {
        self.channel.is_available()
    }

    /// Ask the authority to mute this tab.
    pub async fn mute(&mut self) -> Result<(), DetectorFault> {
        debug!("Sending muteTab");
        let result = self
            .channel
            .send(Request::MuteTab)
            .await
            .and_then(|response| expect_ack("muteTab", response));

        match result {
            Ok(()) => {
                self.muted = true;
                self.uncertain = false;
                // A new ad supersedes an unacknowledged unmute.
                self.pending_unmute = None;
                info!("Tab muted successfully");
                Ok(())
            }
            Err(e) => {
                if e.is_transport() {
                    self.uncertain = true;
                }
                warn!("Failed to mute tab: {}", e);
                Err(e.into())
            }
        }
    }

    /// Ask the authority to unmute this tab and credit `ad_duration` seconds.
    ///
    /// Nothing is sent if this coordinator never muted the tab; the result
    /// tells whether an unmute was acknowledged.
    pub async fn unmute(&mut self, ad_duration: u64) -> Result<bool, DetectorFault> {
        if !self.muted && !self.uncertain {
            debug!("Tab was not muted by this detector, skipping unmute");
            self.pending_unmute = None;
            return Ok(false);
        }

        self.pending_unmute = Some(ad_duration);
        debug!("Sending unmuteTab (adDuration={})", ad_duration);
        let result = self
            .channel
            .send(Request::UnmuteTab { ad_duration })
            .await
            .and_then(|response| expect_ack("unmuteTab", response));

        match result {
            Ok(()) => {
                self.muted = false;
                self.uncertain = false;
                self.pending_unmute = None;
                info!("Tab unmuted successfully ({}s ad)", ad_duration);
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to unmute tab: {}", e);
                Err(e.into())
            }
        }
    }

    /// Whether local mute state disagrees with the ad state.
    pub fn needs_reconcile(&self, ad_active: bool) -> bool {
        if ad_active {
            !self.muted
        } else {
            self.pending_unmute.is_some()
        }
    }

    /// Retry whichever request the ad state still calls for. Returns
    /// whether a request was sent and acknowledged.
    pub async fn reconcile(&mut self, ad_active: bool) -> Result<bool, DetectorFault> {
        if !self.needs_reconcile(ad_active) {
            return Ok(false);
        }
        if ad_active {
            debug!("Ad still active but tab not muted, retrying mute");
            self.mute().await.map(|()| true)
        } else {
            let ad_duration = self.pending_unmute.unwrap_or(0);
            debug!("Retrying pending unmute");
            self.unmute(ad_duration).await
        }
    }

    /// Read the enablement flag.
    pub async fn fetch_enabled(&self) -> Result<bool, DetectorFault> {
        let response = self.channel.send(Request::GetAdMuterState).await?;
        response.as_state().ok_or_else(|| {
            DetectorFault::Channel(ChannelError::MalformedReply(format!(
                "getAdMuterState answered {:?}",
                response
            )))
        })
    }

    /// Liveness probe.
    pub async fn ping(&self) -> Result<(), DetectorFault> {
        let response = self.channel.send(Request::Ping).await?;
        expect_ack("ping", response)?;
        Ok(())
    }
}

fn expect_ack(action: &str, response: Response) -> Result<(), ChannelError> {
    match response {
        Response::Ack(ack) if ack.success => Ok(()),
        Response::Ack(ack) => Err(ChannelError::Rejected(
            ack.error.unwrap_or_else(|| format!("{} failed", action)),
        )),
        other => Err(ChannelError::MalformedReply(format!(
            "{} answered {:?}",
            action, other
        ))),
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
