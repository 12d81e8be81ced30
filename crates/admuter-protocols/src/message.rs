//! Message protocol between detectors and the authority.
//!
//! Requests are discriminated by their `action` field, mirroring the JSON
//! shape exchanged over the extension runtime:
//!
//! | action | request fields | reply |
//! |---|---|---|
//! | `muteTab` | - | `{success}` |
//! | `unmuteTab` | `adDuration` | `{success}` |
//! | `getAdMuterState` | - | `{enabled}` |
//! | `getMetrics` | - | `{adsMuted, timeSaved}` |
//! | `ping` | - | `{success}` |
//! | `setAdMuterState` | `enabled` | `{success}` |
//!
//! The authority pushes `updateAdMuterState` to every detector when the
//! enablement flag changes.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Detector (or settings UI) to authority request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Mute the sender's tab.
    MuteTab,
    /// Unmute the sender's tab and credit the ad to the metrics.
    UnmuteTab {
        /// Whole seconds the ad played.
        #[serde(rename = "adDuration", default)]
        ad_duration: u64,
    },
    /// Read the enablement flag.
    GetAdMuterState,
    /// Read the accumulated metrics.
    GetMetrics,
    /// Liveness probe.
    Ping,
    /// Change the enablement flag and broadcast it (settings UI only).
    SetAdMuterState { enabled: bool },
}

impl Request {
    /// The wire discriminant, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Request::MuteTab => "muteTab",
            Request::UnmuteTab { .. } => "unmuteTab",
            Request::GetAdMuterState => "getAdMuterState",
            Request::GetMetrics => "getMetrics",
            Request::Ping => "ping",
            Request::SetAdMuterState { .. } => "setAdMuterState",
        }
    }
}

/// `{success}` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{enabled}` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReply {
    pub enabled: bool,
}

/// `{adsMuted, timeSaved}` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReply {
    pub ads_muted: u64,
    pub time_saved: String,
}

/// Any authority reply.
///
/// Replies carry no discriminant on the wire, so variants are tried from
/// the most to the least specific shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Metrics(MetricsReply),
    State(StateReply),
    Ack(AckReply),
}

impl Response {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Response::Ack(AckReply {
            success: true,
            error: None,
        })
    }

    /// Failed acknowledgement with a reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Response::Ack(AckReply {
            success: false,
            error: Some(reason.into()),
        })
    }

    pub fn state(enabled: bool) -> Self {
        Response::State(StateReply { enabled })
    }

    pub fn metrics(ads_muted: u64, time_saved: impl Into<String>) -> Self {
        Response::Metrics(MetricsReply {
            ads_muted,
            time_saved: time_saved.into(),
        })
    }

    /// The `success` flag, if this is an acknowledgement.
    pub fn as_ack(&self) -> Option<&AckReply> {
        match self {
            Response::Ack(ack) => Some(ack),
            _ => None,
        }
    }

    /// The `enabled` flag, if this is a state reply.
    pub fn as_state(&self) -> Option<bool> {
        match self {
            Response::State(state) => Some(state.enabled),
            _ => None,
        }
    }
}

/// Authority to detector push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PushMessage {
    /// The enablement flag changed.
    UpdateAdMuterState { enabled: bool },
}

/// A push in flight, carrying the slot the detector answers through.
#[derive(Debug)]
pub struct Delivery {
    pub message: PushMessage,
    pub reply: oneshot::Sender<Response>,
}

impl Delivery {
    /// Wrap a push, returning the receiver for the detector's answer.
    pub fn new(message: PushMessage) -> (Self, oneshot::Receiver<Response>) {
        let (reply, rx) = oneshot::channel();
        (Self { message, reply }, rx)
    }

    /// Answer the push. A sender that stopped waiting is not an error.
    pub fn respond(self, response: Response) {
        let _ = self.reply.send(response);
    }
}
