//! Page (DOM access) errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The document was unloaded while being queried.
    #[error("Document detached")]
    Detached,
}
