//! DOM probe helpers shared by the site profiles.
//!
//! Every helper fails closed: a missing element or an unparsable value is
//! "no evidence", only a failing query is an error.

use std::sync::LazyLock;

use admuter_protocols::{ElementSnapshot, Page, VideoState};
use regex::Regex;

use crate::error::ProbeFault;

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid integer pattern"));

/// Snapshot of the first element matching `selector`.
pub fn query(page: &dyn Page, selector: &str) -> Result<Option<ElementSnapshot>, ProbeFault> {
    page.query(selector)
        .map_err(|source| ProbeFault::new(selector, source))
}

/// The element exists.
pub fn is_present(page: &dyn Page, selector: &str) -> Result<bool, ProbeFault> {
    Ok(query(page, selector)?.is_some())
}

/// At least one of `selectors` exists.
pub fn any_present(page: &dyn Page, selectors: &[&str]) -> Result<bool, ProbeFault> {
    for selector in selectors {
        if is_present(page, selector)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The element exists and is neither `display: none` nor `visibility: hidden`.
pub fn is_shown(page: &dyn Page, selector: &str) -> Result<bool, ProbeFault> {
    Ok(query(page, selector)?.is_some_and(|el| el.is_shown()))
}

/// The element exists and takes part in layout.
pub fn is_rendered(page: &dyn Page, selector: &str) -> Result<bool, ProbeFault> {
    Ok(query(page, selector)?.is_some_and(|el| el.rendered))
}

/// First of `selectors` that exists and takes part in layout.
pub fn first_rendered<'a>(
    page: &dyn Page,
    selectors: &[&'a str],
) -> Result<Option<&'a str>, ProbeFault> {
    for selector in selectors {
        if is_rendered(page, selector)? {
            return Ok(Some(selector));
        }
    }
    Ok(None)
}

/// At least one of `selectors` is shown and has non-blank markup.
pub fn any_shown_with_content(page: &dyn Page, selectors: &[&str]) -> Result<bool, ProbeFault> {
    for selector in selectors {
        if query(page, selector)?.is_some_and(|el| el.is_shown() && el.has_content()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Leading integer of `text`, following `parseInt` prefix rules.
///
/// `"15"` and `" 15s"` give 15, `"0:15"` gives 0, `"ad"` gives `None`.
pub fn parse_countdown(text: &str) -> Option<i64> {
    LEADING_INTEGER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Integer countdown read from an element's text.
///
/// With `require_rendered`, an element outside layout reads as no countdown.
pub fn countdown(
    page: &dyn Page,
    selector: &str,
    require_rendered: bool,
) -> Result<Option<i64>, ProbeFault> {
    let Some(el) = query(page, selector)? else {
        return Ok(None);
    };
    if require_rendered && !el.rendered {
        return Ok(None);
    }
    Ok(parse_countdown(&el.text_content))
}

/// Main video playhead.
pub fn video(page: &dyn Page) -> Result<Option<VideoState>, ProbeFault> {
    page.video()
        .map_err(|source| ProbeFault::new("video", source))
}

/// Seconds of slack before a playhead change counts as a discontinuity.
pub const PLAYHEAD_TOLERANCE_SECS: f64 = 5.0;

/// Detects playhead discontinuities typical of ad-pod insertion.
///
/// A discontinuity is a media duration change beyond the tolerance, or a
/// jump of the current time beyond the tolerance that does not land near
/// the end of the media. The first observation only sets the baseline.
#[derive(Debug, Clone)]
pub struct PlayheadTracker {
    last: Option<VideoState>,
    tolerance: f64,
}

impl Default for PlayheadTracker {
    fn default() -> Self {
        Self::new(PLAYHEAD_TOLERANCE_SECS)
    }
}

impl PlayheadTracker {
    pub fn new(tolerance: f64) -> Self {
        Self {
            last: None,
            tolerance,
        }
    }

    /// Compare against the previous observation and remember `state`.
    pub fn observe(&mut self, state: VideoState) -> bool {
        let discontinuity = match self.last {
            None => false,
            Some(prev) => {
                let duration_changed = (state.duration - prev.duration).abs() > self.tolerance;
                let jump = (state.current_time - prev.current_time).abs();
                let unexpected_jump =
                    jump > self.tolerance && jump < state.duration - self.tolerance;
                duration_changed || unexpected_jump
            }
        };
        self.last = Some(state);
        discontinuity
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
