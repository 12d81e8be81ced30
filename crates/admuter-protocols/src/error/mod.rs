//! Error types for the AdMuter protocol layer.

mod channel;
mod page;

pub use channel::*;
pub use page::*;
