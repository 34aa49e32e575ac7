//! Boundary to the host video page.
//!
//! Everything DOM-shaped (selector lookup, inserting the overlay control,
//! drawing markers, alerts) lives behind [`HostPage`]; the engine only holds
//! opaque [`ElementRef`] handles.

use crate::types::bookmark::Bookmark;

/// Class carried by the overlay control, used for existence checks.
pub const CONTROL_CLASS: &str = "bookmark-btn";

/// Opaque handle to an element of the host page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// The overlay control to insert into the control bar.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub class_name: String,
    /// Resolved icon URL; `None` when the resource could not be resolved.
    pub icon_url: Option<String>,
    pub tooltip: String,
}

/// The host page, as seen from the embedded component.
pub trait HostPage: Send + Sync {
    /// Current page URL.
    fn location(&self) -> String;

    fn query_selector(&self, selector: &str) -> Option<ElementRef>;

    /// Whether the overlay control exists anywhere (`None`) or inside `scope`.
    fn has_control(&self, scope: Option<&ElementRef>) -> bool;

    fn insert_control(&self, anchor: &ElementRef, control: &ControlSpec) -> Result<(), String>;

    /// Playback position of `media` in seconds.
    fn playback_position(&self, media: &ElementRef) -> Option<f64>;

    fn seek(&self, media: &ElementRef, time: f64);

    /// Redraws the bookmark markers for the current video.
    fn render_markers(&self, bookmarks: &[Bookmark]);

    /// Shows a user-visible failure notice.
    fn alert(&self, message: &str);
}

/// Returns the first element matched by `selectors`, tried in order.
pub fn first_match<H: HostPage + ?Sized>(page: &H, selectors: &[String]) -> Option<ElementRef> {
    selectors.iter().find_map(|s| page.query_selector(s))
}
