//! Authority channel protocol.
//!
//! A detector never mutes anything itself: every privileged action is a
//! request sent through an [`AuthorityChannel`] and answered asynchronously.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::{Request, Response};

/// Message-passing link from one detector instance to the authority.
#[async_trait]
pub trait AuthorityChannel: Send + Sync {
    /// Whether the messaging runtime exists in this context at all.
    ///
    /// A `false` here means sending would fail before reaching the
    /// authority, so reconnection attempts skip the ping.
    fn is_available(&self) -> bool {
        true
    }

    /// Send a request and wait for the reply.
    async fn send(&self, request: Request) -> Result<Response, ChannelError>;
}
