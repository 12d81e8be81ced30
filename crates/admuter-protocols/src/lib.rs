//! # AdMuter Protocols
//!
//! Interface definitions shared by the per-tab ad detectors and the
//! privileged authority that mutes tabs. Contains no implementations.
//!
//! ## Core Pieces
//!
//! - [`Request`] / [`Response`] - detector to authority messages
//! - [`PushMessage`] / [`Delivery`] - authority to detector pushes
//! - [`AuthorityChannel`] - the message-passing capability a detector talks through
//! - [`Page`] - read access to the page DOM plus mutation subscriptions
//! - [`Site`] / [`TabId`] - identity of a detector instance

pub mod channel;
pub mod error;
pub mod message;
pub mod page;
pub mod types;

pub use channel::AuthorityChannel;
pub use error::{ChannelError, PageError};
pub use message::{AckReply, Delivery, MetricsReply, PushMessage, Request, Response, StateReply};
pub use page::{
    ElementSnapshot, MutationKind, MutationRecord, MutationStream, ObserveOptions, Page, VideoState,
};
pub use types::{ParseSiteError, Site, TabId};
