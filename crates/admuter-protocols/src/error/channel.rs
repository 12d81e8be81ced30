//! Channel errors.

use thiserror::Error;

/// Failures of the detector to authority messaging link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The messaging runtime is not present in this page context.
    #[error("Messaging runtime not available")]
    RuntimeUnavailable,

    /// The privileged context was torn down (extension reloaded or updated).
    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// No receiver answered the message.
    #[error("Authority unreachable: {0}")]
    Unreachable(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The receiver dropped the reply slot without answering.
    #[error("No response received from authority")]
    NoResponse,

    /// A reply arrived but did not have the expected shape.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// The authority answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ChannelError {
    /// Whether the privileged context is gone and needs a fresh handshake.
    pub fn is_invalidation(&self) -> bool {
        matches!(self, ChannelError::ContextInvalidated)
    }

    /// Whether the failure happened before any reply was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChannelError::RuntimeUnavailable
                | ChannelError::ContextInvalidated
                | ChannelError::Unreachable(_)
                | ChannelError::SendFailed(_)
                | ChannelError::NoResponse
        )
    }
}
