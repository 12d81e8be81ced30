//! In-memory [`Page`] implementation.
//!
//! Backs the unit tests and the `replay` command: elements are keyed by the
//! exact selector a profile queries, and every change is fanned out to
//! matching observers as a mutation record.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use admuter_protocols::{
    ElementSnapshot, MutationKind, MutationRecord, MutationStream, ObserveOptions, Page, PageError,
    Site, VideoState,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

struct Observer {
    target: String,
    options: ObserveOptions,
    tx: mpsc::UnboundedSender<MutationRecord>,
}

#[derive(Default)]
struct PageState {
    elements: HashMap<String, ElementSnapshot>,
    video: Option<VideoState>,
    observers: Vec<Observer>,
    failures: HashMap<String, PageError>,
    clicks: Vec<String>,
}

impl PageState {
    fn check(&self, selector: &str) -> Result<(), PageError> {
        match self.failures.get(selector) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn notify(&mut self, kind: MutationKind, target: &str) {
        self.observers.retain(|observer| !observer.tx.is_closed());
        for observer in &self.observers {
            if !observer.options.accepts(kind) {
                continue;
            }
            if !observer.options.subtree && observer.target != target {
                continue;
            }
            let _ = observer.tx.send(MutationRecord {
                kind,
                target: target.to_string(),
            });
        }
    }
}

/// A scripted document.
#[derive(Default)]
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert) without notifications.
    pub fn with_element(self, selector: impl Into<String>, element: ElementSnapshot) -> Self {
        self.state.lock().elements.insert(selector.into(), element);
        self
    }

    /// Add or replace an element, notifying observers.
    ///
    /// A new element is a child-list change. A replaced element is a
    /// child-list change if its markup changed, character data if only its
    /// text changed, and an attribute change otherwise.
    pub fn insert(&self, selector: impl Into<String>, element: ElementSnapshot) {
        let selector = selector.into();
        let mut state = self.state.lock();
        let kind = match state.elements.get(&selector) {
            None => Some(MutationKind::ChildList),
            Some(old) if old.inner_html != element.inner_html => Some(MutationKind::ChildList),
            Some(old) if old.text_content != element.text_content => {
                Some(MutationKind::CharacterData)
            }
            Some(old) if *old != element => Some(MutationKind::Attributes),
            Some(_) => None,
        };
        state.elements.insert(selector.clone(), element);
        if let Some(kind) = kind {
            state.notify(kind, &selector);
        }
    }

    /// Remove an element, notifying observers if it existed.
    ///
    /// Observers rooted at the removed element are disconnected.
    pub fn remove(&self, selector: &str) {
        let mut state = self.state.lock();
        if state.elements.remove(selector).is_some() {
            state.observers.retain(|observer| observer.target != selector);
            state.notify(MutationKind::ChildList, selector);
        }
    }

    /// Playback progress does not mutate the DOM, so no notification.
    pub fn set_video(&self, video: Option<VideoState>) {
        self.state.lock().video = video;
    }

    /// Make every access to `selector` fail with `error`.
    pub fn fail_queries(&self, selector: impl Into<String>, error: PageError) {
        self.state.lock().failures.insert(selector.into(), error);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Selectors clicked so far, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    /// Live observers.
    pub fn observer_count(&self) -> usize {
        let mut state = self.state.lock();
        state.observers.retain(|observer| !observer.tx.is_closed());
        state.observers.len()
    }

    /// Apply one timeline frame.
    pub fn apply(&self, frame: &PageFrame) {
        for selector in &frame.remove {
            self.remove(selector);
        }
        for (selector, element) in &frame.set {
            self.insert(selector.clone(), element.clone());
        }
        if let Some(video) = frame.video {
            self.set_video(Some(video));
        }
    }
}

impl Page for MemoryPage {
    fn query(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError> {
        let state = self.state.lock();
        state.check(selector)?;
        Ok(state.elements.get(selector).cloned())
    }

    fn video(&self) -> Result<Option<VideoState>, PageError> {
        let state = self.state.lock();
        state.check("video")?;
        Ok(state.video)
    }

    fn observe(
        &self,
        selector: &str,
        options: ObserveOptions,
    ) -> Result<Option<MutationStream>, PageError> {
        let mut state = self.state.lock();
        state.check(selector)?;
        if !state.elements.contains_key(selector) {
            return Ok(None);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.observers.push(Observer {
            target: selector.to_string(),
            options,
            tx,
        });
        Ok(Some(MutationStream::new(rx)))
    }

    fn click(&self, selector: &str) -> Result<bool, PageError> {
        let mut state = self.state.lock();
        state.check(selector)?;
        if !state.elements.contains_key(selector) {
            return Ok(false);
        }
        state.clicks.push(selector.to_string());
        Ok(true)
    }
}

/// One step of a scripted page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageFrame {
    /// Offset from the start of the timeline.
    #[serde(default)]
    pub at_ms: u64,
    /// Elements to add or replace.
    #[serde(default)]
    pub set: BTreeMap<String, ElementSnapshot>,
    /// Elements to remove.
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub video: Option<VideoState>,
}

/// A recorded page session for offline replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTimeline {
    /// Site the recording was made on.
    #[serde(default)]
    pub site: Option<Site>,
    pub frames: Vec<PageFrame>,
    /// Keep running this long after the last frame.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_tail_ms() -> u64 {
    2000
}

impl PageTimeline {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut timeline: PageTimeline = serde_json::from_str(json)?;
        timeline.frames.sort_by_key(|frame| frame.at_ms);
        Ok(timeline)
    }

    pub async fn load(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Offset of the last frame plus the tail.
    pub fn total_ms(&self) -> u64 {
        self.frames.last().map(|frame| frame.at_ms).unwrap_or(0) + self.tail_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_observer_receives_matching_kinds() {
        let page = MemoryPage::new().with_element("body", ElementSnapshot::new());
        let mut tree = page.observe("body", ObserveOptions::TREE).unwrap().unwrap();
        let mut all = page.observe("body", ObserveOptions::ALL).unwrap().unwrap();

        page.insert(".ad", ElementSnapshot::new());
        page.insert(".ad", ElementSnapshot::new().with_display("none"));

        assert_eq!(tree.next().await.unwrap().kind, MutationKind::ChildList);
        assert_eq!(tree.drain(), 0);

        assert_eq!(all.next().await.unwrap().kind, MutationKind::ChildList);
        assert_eq!(all.next().await.unwrap().kind, MutationKind::Attributes);
    }

    #[tokio::test]
    async fn test_text_change_is_character_data() {
        let page = MemoryPage::new().with_element("body", ElementSnapshot::new());
        let mut stream = page.observe("body", ObserveOptions::ALL).unwrap().unwrap();

        page.insert(".count", ElementSnapshot::new().with_text("5"));
        page.insert(".count", ElementSnapshot::new().with_text("4"));
        page.insert(".count", ElementSnapshot::new().with_text("4"));

        assert_eq!(stream.next().await.unwrap().kind, MutationKind::ChildList);
        assert_eq!(stream.next().await.unwrap().kind, MutationKind::CharacterData);
        assert_eq!(stream.drain(), 0);
    }

    #[test]
    fn test_observe_missing_container() {
        let page = MemoryPage::new();
        assert!(page.observe("#player", ObserveOptions::ALL).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_removing_root_closes_stream() {
        let page = MemoryPage::new().with_element("#player", ElementSnapshot::new());
        let mut stream = page.observe("#player", ObserveOptions::ALL).unwrap().unwrap();
        assert_eq!(page.observer_count(), 1);

        page.remove("#player");
        assert!(stream.next().await.is_none());
        assert_eq!(page.observer_count(), 0);
    }

    #[test]
    fn test_dropped_stream_is_pruned() {
        let page = MemoryPage::new().with_element("body", ElementSnapshot::new());
        let stream = page.observe("body", ObserveOptions::ALL).unwrap();
        drop(stream);
        assert_eq!(page.observer_count(), 0);
    }

    #[test]
    fn test_click_records_existing_elements() {
        let page = MemoryPage::new().with_element(".skip", ElementSnapshot::new());
        assert!(page.click(".skip").unwrap());
        assert!(!page.click(".missing").unwrap());
        assert_eq!(page.clicks(), vec![".skip".to_string()]);
    }

    #[test]
    fn test_timeline_parsing() {
        let json = r#"{
            "site": "twitch",
            "frames": [
                {"at_ms": 1500, "remove": [".ad"]},
                {"at_ms": 0, "set": {".ad": {"text_content": "Ad"}}}
            ]
        }"#;
        let timeline = PageTimeline::from_json(json).unwrap();
        assert_eq!(timeline.site, Some(Site::Twitch));
        assert_eq!(timeline.frames[0].at_ms, 0);
        assert_eq!(timeline.total_ms(), 3500);

        let page = MemoryPage::new();
        page.apply(&timeline.frames[0]);
        assert_eq!(page.query(".ad").unwrap().unwrap().text_content, "Ad");
        page.apply(&timeline.frames[1]);
        assert!(page.query(".ad").unwrap().is_none());
    }
}
