//! Tab control capability.

use async_trait::async_trait;
use admuter_protocols::TabId;
use dashmap::{DashMap, DashSet};

use crate::error::AuthorityError;

/// The browser's ability to change a tab's audio state.
#[async_trait]
pub trait TabController: Send + Sync {
    async fn set_muted(&self, tab: TabId, muted: bool) -> Result<(), AuthorityError>;
}

/// In-process tab table.
///
/// Tracks the muted flag per tab and can be told to refuse actions on a
/// tab, the way a closed or navigated-away tab would.
#[derive(Default)]
pub struct MemoryTabs {
    muted: DashMap<TabId, bool>,
    refused: DashSet<TabId>,
}

impl MemoryTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_muted(&self, tab: TabId) -> bool {
        self.muted.get(&tab).map(|m| *m).unwrap_or(false)
    }

    /// Refuse every action on `tab` until [`allow`](Self::allow) is called.
    pub fn refuse(&self, tab: TabId) {
        self.refused.insert(tab);
    }

    pub fn allow(&self, tab: TabId) {
        self.refused.remove(&tab);
    }
}

#[async_trait]
impl TabController for MemoryTabs {
    async fn set_muted(&self, tab: TabId, muted: bool) -> Result<(), AuthorityError> {
        if self.refused.contains(&tab) {
            return Err(AuthorityError::tab_action(tab, "No tab with id"));
        }
        self.muted.insert(tab, muted);
        Ok(())
    }
}
