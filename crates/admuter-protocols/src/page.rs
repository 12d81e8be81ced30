//! Page protocol: the slice of the DOM a detector is allowed to see.
//!
//! Detectors read snapshots of single elements located by CSS selector,
//! the state of the main `<video>` element, and subscribe to subtree
//! mutations below a container. Missing elements are `Ok(None)`, never
//! errors; errors are reserved for the query itself failing.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::PageError;

/// Point-in-time view of one element, as far as ad heuristics care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSnapshot {
    /// Computed `display` value.
    pub display: String,
    /// Computed `visibility` value.
    pub visibility: String,
    /// Serialized child markup.
    pub inner_html: String,
    /// Text content of the element and its descendants.
    pub text_content: String,
    /// Whether the element takes part in layout (`offsetParent !== null`).
    pub rendered: bool,
}

impl Default for ElementSnapshot {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            inner_html: String::new(),
            text_content: String::new(),
            rendered: true,
        }
    }
}

impl ElementSnapshot {
    /// A displayed, empty element.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    pub fn with_inner_html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = html.into();
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    /// `display: none`, and therefore not rendered.
    pub fn hidden(mut self) -> Self {
        self.display = "none".to_string();
        self.rendered = false;
        self
    }

    /// Neither `display: none` nor `visibility: hidden`.
    pub fn is_shown(&self) -> bool {
        self.display != "none" && self.visibility != "hidden"
    }

    /// Inner markup is non-blank.
    pub fn has_content(&self) -> bool {
        !self.inner_html.trim().is_empty()
    }
}

/// Playhead of the main video element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoState {
    /// Seconds into the current media.
    pub current_time: f64,
    /// Media length in seconds (`NaN` while unknown).
    pub duration: f64,
}

/// Which mutations a subscription reports, as in `MutationObserverInit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    /// Node additions and removals anywhere below the target.
    pub const TREE: ObserveOptions = ObserveOptions {
        child_list: true,
        subtree: true,
        attributes: false,
        character_data: false,
    };

    /// Tree changes plus attribute changes.
    pub const TREE_AND_ATTRIBUTES: ObserveOptions = ObserveOptions {
        child_list: true,
        subtree: true,
        attributes: true,
        character_data: false,
    };

    /// Every mutation kind below the target.
    pub const ALL: ObserveOptions = ObserveOptions {
        child_list: true,
        subtree: true,
        attributes: true,
        character_data: true,
    };

    /// Whether a mutation of `kind` is reported under these options.
    pub fn accepts(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => self.attributes,
            MutationKind::CharacterData => self.character_data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// One observed DOM mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Selector of the node that changed.
    pub target: String,
}

/// Live mutation subscription. Dropping it disconnects the observer.
#[derive(Debug)]
pub struct MutationStream {
    rx: mpsc::UnboundedReceiver<MutationRecord>,
}

impl MutationStream {
    pub fn new(rx: mpsc::UnboundedReceiver<MutationRecord>) -> Self {
        Self { rx }
    }

    /// Wait for the next record; `None` once the page side disconnected.
    pub async fn next(&mut self) -> Option<MutationRecord> {
        self.rx.recv().await
    }

    /// Discard already-queued records, returning how many were dropped.
    ///
    /// Observers deliver mutations in batches; one re-evaluation covers
    /// the whole batch.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}

/// Read access to a page document.
pub trait Page: Send + Sync {
    /// First element matching `selector`.
    fn query(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError>;

    /// State of the first `<video>` element, if any.
    fn video(&self) -> Result<Option<VideoState>, PageError>;

    /// Subscribe to mutations below the element matching `selector`.
    ///
    /// Returns `Ok(None)` when the element does not exist yet.
    fn observe(
        &self,
        selector: &str,
        options: ObserveOptions,
    ) -> Result<Option<MutationStream>, PageError>;

    /// Click the element matching `selector`. `Ok(false)` if absent.
    fn click(&self, selector: &str) -> Result<bool, PageError>;
}
