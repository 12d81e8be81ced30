//! In-process authority channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use admuter_protocols::{AuthorityChannel, ChannelError, Request, Response, TabId};
use async_trait::async_trait;

use crate::authority::Authority;

/// Direct link from one tab (or the settings UI, with no tab) to an
/// [`Authority`] in the same process.
///
/// [`invalidate`](Self::invalidate) simulates the privileged context being
/// torn down: every send fails with `ContextInvalidated` until restored.
pub struct LocalChannel {
    authority: Arc<Authority>,
    tab: Option<TabId>,
    invalidated: AtomicBool,
}

impl LocalChannel {
    pub fn new(authority: Arc<Authority>, tab: Option<TabId>) -> Self {
        Self {
            authority,
            tab,
            invalidated: AtomicBool::new(false),
        }
    }

    pub fn tab(&self) -> Option<TabId> {
        self.tab
    }

    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        self.invalidated.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthorityChannel for LocalChannel {
    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        if self.invalidated.load(Ordering::SeqCst) {
            return Err(ChannelError::ContextInvalidated);
        }
        Ok(self.authority.handle(self.tab, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tabs::MemoryTabs;

    fn authority() -> Arc<Authority> {
        Arc::new(Authority::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryTabs::new()),
        ))
    }

    #[tokio::test]
    async fn test_forwards_with_sender_tab() {
        let channel = LocalChannel::new(authority(), Some(TabId(4)));
        let response = channel.send(Request::MuteTab).await.unwrap();
        assert_eq!(response, Response::ok());
    }

    #[tokio::test]
    async fn test_settings_ui_has_no_tab() {
        let channel = LocalChannel::new(authority(), None);
        let response = channel.send(Request::MuteTab).await.unwrap();
        assert_eq!(response, Response::failure("No tab ID"));
    }

    #[tokio::test]
    async fn test_invalidated_until_restored() {
        let channel = LocalChannel::new(authority(), Some(TabId(1)));
        channel.invalidate();
        assert_eq!(
            channel.send(Request::Ping).await.unwrap_err(),
            ChannelError::ContextInvalidated
        );

        channel.restore();
        assert_eq!(channel.send(Request::Ping).await.unwrap(), Response::ok());
    }
}
