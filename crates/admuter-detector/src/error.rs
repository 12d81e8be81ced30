//! Fault taxonomy for a detector instance.
//!
//! Nothing here ever reaches the user: every fault is contained inside the
//! detector and routed to the [`ReconnectionSupervisor`](crate::ReconnectionSupervisor).

use admuter_protocols::{ChannelError, PageError};
use thiserror::Error;

/// A DOM query failed while collecting signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Probe failed on `{selector}`: {source}")]
pub struct ProbeFault {
    pub selector: String,
    pub source: PageError,
}

impl ProbeFault {
    pub fn new(selector: impl Into<String>, source: PageError) -> Self {
        Self {
            selector: selector.into(),
            source,
        }
    }
}

/// Everything that can go wrong inside one detector instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorFault {
    #[error(transparent)]
    Probe(#[from] ProbeFault),

    /// Message send or receive failure, or an unusable reply.
    #[error("Channel fault: {0}")]
    Channel(ChannelError),

    /// The privileged context was torn down.
    #[error("Extension context invalidated")]
    ChannelInvalidated,

    /// The startup reconnection loop ran out of attempts.
    #[error("Reconnection gave up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
}

impl From<ChannelError> for DetectorFault {
    fn from(error: ChannelError) -> Self {
        if error.is_invalidation() {
            DetectorFault::ChannelInvalidated
        } else {
            DetectorFault::Channel(error)
        }
    }
}

impl DetectorFault {
    /// Short label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectorFault::Probe(_) => "probe",
            DetectorFault::Channel(_) => "channel",
            DetectorFault::ChannelInvalidated => "invalidated",
            DetectorFault::ExhaustedRetries { .. } => "exhausted",
        }
    }
}
