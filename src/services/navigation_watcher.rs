//! Navigation Watcher for Vidmarks.
//!
//! Turns the page's navigation signals into one "content changed"
//! notification per video. Document-ready resolves immediately; in-page (SPA)
//! transitions and coordinator announcements are debounced, so a burst of
//! signals inside the window yields a single setup cycle.
//!
//! Anchor discovery then polls the page for the control bar and the media
//! element, since the host inserts them some time after its own navigation
//! event with no completion callback.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::services::host_page::{first_match, ElementRef, HostPage};
use crate::types::bookmark::ContentId;
use crate::types::errors::AnchorError;
use crate::types::settings::HostSettings;

pub const NAVIGATION_DEBOUNCE: Duration = Duration::from_millis(500);
pub const ANCHOR_TIMEOUT: Duration = Duration::from_millis(5000);
pub const ANCHOR_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Polls `probe` every `interval` until it yields a value or `timeout` elapses.
///
/// The probe runs once more at the deadline before giving up. Dropping the
/// returned future cancels the wait.
pub async fn await_condition<T, F>(mut probe: F, interval: Duration, timeout: Duration) -> Option<T>
where
    F: FnMut() -> Option<T>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe() {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// The two page elements the overlay depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchors {
    pub control_bar: ElementRef,
    pub media: ElementRef,
}

/// Waits for both anchors, trying each anchor's fallback selectors in order.
///
/// # Errors
/// `AnchorError::Timeout` after [`ANCHOR_TIMEOUT`] if either never appears.
pub async fn discover_anchors<H: HostPage + ?Sized>(page: &H, host: &HostSettings) -> Result<Anchors, AnchorError> {
    let found = await_condition(
        || {
            Some(Anchors {
                control_bar: first_match(page, &host.control_bar_selectors)?,
                media: first_match(page, &host.media_selectors)?,
            })
        },
        ANCHOR_RETRY_INTERVAL,
        ANCHOR_TIMEOUT,
    )
    .await;

    found.ok_or(AnchorError::Timeout {
        waited_ms: ANCHOR_TIMEOUT.as_millis() as u64,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    AwaitingAnchors,
}

/// A navigation signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// The document finished loading.
    DocumentReady,
    /// The host page completed a same-document transition.
    SpaNavigated,
    /// The coordinator announced the video now shown in this tab.
    ContentAnnounced(ContentId),
}

/// One deduplicated notification of what the page now shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentChange {
    /// Now viewing `id`. `repeat` is set when it is the same id as the previous notification.
    Viewing { id: ContentId, repeat: bool },
    /// The page no longer shows a video.
    Cleared,
}

impl ContentChange {
    pub fn id(&self) -> Option<&ContentId> {
        match self {
            Self::Viewing { id, .. } => Some(id),
            Self::Cleared => None,
        }
    }

    pub fn is_repeat(&self) -> bool {
        matches!(self, Self::Viewing { repeat: true, .. })
    }
}

#[derive(Debug)]
struct PendingChange {
    announced: Option<ContentId>,
    due: Instant,
}

/// Debouncing state machine over navigation triggers.
pub struct NavigationWatcher {
    state: WatchState,
    pending: Option<PendingChange>,
    last_seen: Option<ContentId>,
    watch_marker: String,
    content_param: String,
    cycles_started: u64,
}

impl NavigationWatcher {
    pub fn new(host: &HostSettings) -> Self {
        Self {
            state: WatchState::Idle,
            pending: None,
            last_seen: None,
            watch_marker: host.watch_marker.clone(),
            content_param: host.content_param.clone(),
            cycles_started: 0,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn last_seen(&self) -> Option<&ContentId> {
        self.last_seen.as_ref()
    }

    /// Number of anchor-discovery cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started
    }

    /// Records a trigger observed at `now`.
    ///
    /// Document-ready is resolved against `location` right away and cancels
    /// any pending debounced change. Other triggers (re)arm the debounce
    /// window and return `None`; the latest trigger in a burst wins.
    ///
    /// A location without a video id resolves to [`ContentChange::Cleared`].
    pub fn observe(&mut self, trigger: Trigger, location: &str, now: Instant) -> Option<ContentChange> {
        match trigger {
            Trigger::DocumentReady => {
                self.pending = None;
                self.resolve(None, location)
            }
            Trigger::SpaNavigated => {
                self.arm(None, now);
                None
            }
            Trigger::ContentAnnounced(id) => {
                self.arm(Some(id), now);
                None
            }
        }
    }

    fn arm(&mut self, announced: Option<ContentId>, now: Instant) {
        if self.pending.is_some() {
            debug!("navigation signal coalesced into pending change");
        }
        self.pending = Some(PendingChange {
            announced,
            due: now + NAVIGATION_DEBOUNCE,
        });
    }

    /// When the pending change, if any, becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Fires the pending change if its debounce window has passed.
    pub fn poll_due(&mut self, location: &str, now: Instant) -> Option<ContentChange> {
        if self.deadline()? > now {
            return None;
        }
        let announced = self.pending.take().and_then(|p| p.announced);
        self.resolve(announced, location)
    }

    fn resolve(&mut self, announced: Option<ContentId>, location: &str) -> Option<ContentChange> {
        let id = announced.or_else(|| ContentId::from_url(location, &self.watch_marker, &self.content_param));
        let Some(id) = id else {
            debug!(location, "no video on this page");
            self.last_seen = None;
            return Some(ContentChange::Cleared);
        };
        let repeat = self.last_seen.as_ref() == Some(&id);
        self.last_seen = Some(id.clone());
        Some(ContentChange::Viewing { id, repeat })
    }

    /// Enters `AwaitingAnchors`. Returns `false` if a cycle is already running.
    pub fn begin_discovery(&mut self) -> bool {
        if self.state == WatchState::AwaitingAnchors {
            warn!("anchor discovery already in progress");
            return false;
        }
        self.state = WatchState::AwaitingAnchors;
        self.cycles_started += 1;
        true
    }

    pub fn finish_discovery(&mut self) {
        self.state = WatchState::Idle;
    }
}
