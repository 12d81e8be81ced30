//! # AdMuter Authority
//!
//! The privileged side of AdMuter. Detectors never touch tab audio
//! themselves; they send requests here and the [`Authority`]:
//!
//! - mutes and unmutes the sending tab through a [`TabController`]
//! - keeps the enablement flag and the `adsMuted` / `secondsSaved`
//!   metrics in a [`SettingsStore`]
//! - pushes enablement changes to every registered tab
//!
//! [`LocalChannel`] connects a detector to an authority in the same process.

pub mod authority;
pub mod channel;
pub mod error;
pub mod format;
pub mod store;
pub mod tabs;

pub use authority::{Authority, INBOX_CAPACITY};
pub use channel::LocalChannel;
pub use error::AuthorityError;
pub use format::format_time_saved;
pub use store::{JsonFileStore, MemoryStore, Settings, SettingsStore};
pub use tabs::{MemoryTabs, TabController};
