//! Authority error types.

use admuter_protocols::TabId;
use thiserror::Error;

/// Failures inside the privileged side.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The request did not come from a tab.
    #[error("No tab ID")]
    NoTab,

    /// The browser refused to change the tab.
    #[error("Tab action failed for {tab}: {reason}")]
    TabAction { tab: TabId, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthorityError {
    pub fn tab_action(tab: TabId, reason: impl Into<String>) -> Self {
        Self::TabAction {
            tab,
            reason: reason.into(),
        }
    }
}
