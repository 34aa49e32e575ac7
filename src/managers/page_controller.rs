//! Page Controller for Vidmarks.
//!
//! The page-embedded component of one tab. Owns the per-tab [`PageSession`]
//! and runs a single cooperative event loop over inbound commands, page
//! navigation events, store change notifications and the navigation
//! debounce deadline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::kv_store::KeyValueStore;
use crate::services::host_page::{ControlSpec, HostPage, CONTROL_CLASS};
use crate::services::lifecycle_guard::{LifecycleGuard, ResourceResolver};
use crate::services::message_router::{CommandHandler, MessageRouter, RouteOutcome};
use crate::services::navigation_watcher::{
    discover_anchors, Anchors, ContentChange, NavigationWatcher, Trigger,
};
use crate::services::timestamp_store::TimestampStore;
use crate::types::bookmark::{Bookmark, ContentId};
use crate::types::errors::{AnchorError, StoreError};
use crate::types::settings::HostSettings;

const RELOAD_NOTICE: &str = "Vidmarks was updated or reloaded. Refresh the page to keep bookmarking.";

/// Signals raised by the host page itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    DocumentReady,
    SpaNavigated,
    /// The user clicked the overlay control.
    ControlClicked,
}

/// Anchor search started for one video, polled by the event loop.
struct PendingDiscovery {
    video: ContentId,
    search: Pin<Box<dyn Future<Output = Result<Anchors, AnchorError>> + Send>>,
}

/// Per-tab state. Initialised on a content change, dropped with the context.
///
/// `bookmarks` is a cache for rendering only; mutations always re-read the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSession {
    pub current_video: Option<ContentId>,
    pub bookmarks: Vec<Bookmark>,
    pub anchors: Option<Anchors>,
}

pub struct PageController<S: KeyValueStore, H: HostPage> {
    instance: Uuid,
    store: TimestampStore<S>,
    page: Arc<H>,
    router: MessageRouter,
    resolver: ResourceResolver,
    watcher: NavigationWatcher,
    host: HostSettings,
    session: PageSession,
    discovery: Option<PendingDiscovery>,
}

impl<S: KeyValueStore + 'static, H: HostPage + 'static> PageController<S, H> {
    pub fn new(store: TimestampStore<S>, page: Arc<H>, resolver: ResourceResolver, host: HostSettings) -> Self {
        let router = MessageRouter::new(store.session().clone());
        Self {
            instance: Uuid::new_v4(),
            store,
            page,
            router,
            resolver,
            watcher: NavigationWatcher::new(&host),
            host,
            session: PageSession::default(),
            discovery: None,
        }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    pub fn watcher(&self) -> &NavigationWatcher {
        &self.watcher
    }

    /// Runs until either input channel closes, then hands the controller back.
    ///
    /// Anchor discovery is polled as one more branch of the loop, so commands
    /// and store changes keep being handled while the page is searched.
    pub async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Value>,
        mut events: mpsc::UnboundedReceiver<PageEvent>,
    ) -> Self {
        info!(instance = %self.instance, "page controller started");
        let mut changes = self.store.subscribe();

        loop {
            let deadline = self.watcher.deadline();
            tokio::select! {
                raw = inbox.recv() => match raw {
                    Some(raw) => {
                        self.handle_message(&raw).await;
                    }
                    None => break,
                },
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                Some((id, bookmarks)) = changes.next() => self.apply_external_change(&id, bookmarks),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let location = self.page.location();
                    if let Some(change) = self.watcher.poll_due(&location, Instant::now()) {
                        self.on_content_change(change).await;
                    }
                }
                result = next_discovery(&mut self.discovery), if self.discovery.is_some() => {
                    self.complete_discovery(result);
                }
            }
        }

        info!(instance = %self.instance, "page controller stopped");
        self
    }

    /// Routes one inbound wire message.
    pub async fn handle_message(&mut self, raw: &Value) -> RouteOutcome {
        let router = self.router.clone();
        router.route(self, raw).await
    }

    pub async fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::DocumentReady => {
                let location = self.page.location();
                if let Some(change) = self.watcher.observe(Trigger::DocumentReady, &location, Instant::now()) {
                    self.on_content_change(change).await;
                }
            }
            PageEvent::SpaNavigated => {
                let location = self.page.location();
                self.watcher.observe(Trigger::SpaNavigated, &location, Instant::now());
            }
            PageEvent::ControlClicked => self.create_bookmark().await,
        }
    }

    /// Sets up the page for the video in `change`, or resets it when there is none.
    ///
    /// The bookmark cache is always refreshed. Anchor discovery starts only
    /// when the overlay control is missing or no anchors are bound yet; it
    /// completes in [`run`](Self::run) or [`await_discovery`](Self::await_discovery).
    pub async fn on_content_change(&mut self, change: ContentChange) {
        let ContentChange::Viewing { id, repeat } = change else {
            self.clear_content();
            return;
        };
        debug!(video = %id, repeat, "content changed");
        self.session.current_video = Some(id.clone());
        self.refresh(&id).await;

        if self.page.has_control(None) && self.session.anchors.is_some() {
            debug!(video = %id, "overlay control already present");
            return;
        }
        if !self.store.session().is_valid() {
            debug!("skipping overlay setup: session invalid");
            return;
        }
        if self.discovery.as_ref().is_some_and(|pending| pending.video == id) {
            debug!(video = %id, "anchor discovery already running");
            return;
        }
        self.cancel_discovery();
        if !self.watcher.begin_discovery() {
            return;
        }

        let page = Arc::clone(&self.page);
        let host = self.host.clone();
        self.discovery = Some(PendingDiscovery {
            video: id,
            search: Box::pin(async move { discover_anchors(page.as_ref(), &host).await }),
        });
    }

    /// Forgets the current video after navigating to a page without one.
    fn clear_content(&mut self) {
        if let Some(id) = self.session.current_video.take() {
            debug!(video = %id, "left video page");
        }
        self.cancel_discovery();
        self.session.bookmarks.clear();
        self.page.render_markers(&self.session.bookmarks);
    }

    fn cancel_discovery(&mut self) {
        if let Some(pending) = self.discovery.take() {
            debug!(video = %pending.video, "anchor discovery cancelled");
            self.watcher.finish_discovery();
        }
    }

    /// Waits for a pending anchor discovery, if any, and applies its result.
    ///
    /// For callers driving the controller without [`run`](Self::run).
    pub async fn await_discovery(&mut self) {
        if self.discovery.is_some() {
            let result = next_discovery(&mut self.discovery).await;
            self.complete_discovery(result);
        }
    }

    fn complete_discovery(&mut self, result: Result<Anchors, AnchorError>) {
        let Some(pending) = self.discovery.take() else {
            return;
        };
        self.watcher.finish_discovery();
        match result.and_then(|anchors| self.install_control(anchors)) {
            Ok(()) => {}
            Err(e) => warn!(video = %pending.video, error = %e, "bookmark control unavailable for this video"),
        }
    }

    fn install_control(&mut self, anchors: Anchors) -> Result<(), AnchorError> {
        // The page may have gained a control while discovery was polling.
        if self.page.has_control(Some(&anchors.control_bar)) {
            debug!("overlay control inserted concurrently, not adding another");
        } else {
            let control = ControlSpec {
                class_name: CONTROL_CLASS.to_string(),
                icon_url: self.resolver.resolve(&self.host.control_icon),
                tooltip: self.host.control_tooltip.clone(),
            };
            self.page
                .insert_control(&anchors.control_bar, &control)
                .map_err(AnchorError::InsertRejected)?;
            debug!("overlay control inserted");
        }
        self.session.anchors = Some(anchors);
        Ok(())
    }

    async fn refresh(&mut self, id: &ContentId) {
        self.session.bookmarks = self.store.fetch(id).await;
        self.page.render_markers(&self.session.bookmarks);
    }

    /// Applies a change written by any context, if it concerns the current video.
    pub fn apply_external_change(&mut self, id: &ContentId, bookmarks: Vec<Bookmark>) {
        if self.session.current_video.as_ref() != Some(id) {
            return;
        }
        self.session.bookmarks = bookmarks;
        self.page.render_markers(&self.session.bookmarks);
    }

    /// Bookmarks the media element's current playback position.
    pub async fn create_bookmark(&mut self) {
        let Some(id) = self.session.current_video.clone() else {
            debug!("create ignored: no video");
            return;
        };
        let Some(media) = self.session.anchors.as_ref().map(|a| a.media.clone()) else {
            warn!(video = %id, "create ignored: no media element bound");
            return;
        };
        let Some(position) = self.page.playback_position(&media) else {
            warn!(video = %id, "create ignored: playback position unavailable");
            return;
        };

        let result = match Bookmark::at(position) {
            Ok(bookmark) => self.store.append(&id, bookmark).await,
            Err(e) => Err(e),
        };
        self.after_user_write(&id, result, "Could not save the bookmark.");
    }

    pub fn jump(&self, time: f64) {
        if self.session.current_video.is_none() {
            debug!(time, "jump ignored: no video");
            return;
        }
        match &self.session.anchors {
            Some(anchors) => self.page.seek(&anchors.media, time),
            None => debug!(time, "jump ignored: no media element bound"),
        }
    }

    pub async fn delete(&mut self, time: f64) {
        let Some(id) = self.session.current_video.clone() else {
            debug!("delete ignored: no video");
            return;
        };
        let result = self.store.remove_one(&id, time).await;
        self.after_user_write(&id, result, "Could not delete the bookmark.");
    }

    pub async fn delete_all(&mut self) {
        let Some(id) = self.session.current_video.clone() else {
            debug!("delete-all ignored: no video");
            return;
        };
        let result = self.store.remove_all(&id).await.map(|()| Vec::new());
        self.after_user_write(&id, result, "Could not delete the bookmarks.");
    }

    /// Updates the cache after a user-initiated write, or tells the user why it failed.
    fn after_user_write(&mut self, id: &ContentId, result: Result<Vec<Bookmark>, StoreError>, failure: &str) {
        match result {
            Ok(bookmarks) => self.apply_external_change(id, bookmarks),
            Err(StoreError::NotFound(time)) => debug!(video = %id, time, "nothing to delete"),
            Err(StoreError::SessionInvalid) => self.page.alert(RELOAD_NOTICE),
            Err(e) => {
                warn!(video = %id, error = %e, "bookmark write failed");
                self.page.alert(failure);
            }
        }
    }
}

/// Resolves with the pending discovery's result. Cancel-safe: the search
/// stays in `pending` if this future is dropped first.
async fn next_discovery(pending: &mut Option<PendingDiscovery>) -> Result<Anchors, AnchorError> {
    match pending {
        Some(discovery) => discovery.search.as_mut().await,
        None => std::future::pending().await,
    }
}

impl<S: KeyValueStore + 'static, H: HostPage + 'static> CommandHandler for PageController<S, H> {
    async fn on_new(&mut self, id: ContentId) {
        let location = self.page.location();
        self.watcher.observe(Trigger::ContentAnnounced(id), &location, Instant::now());
    }

    async fn on_jump(&mut self, time: f64) {
        self.jump(time);
    }

    async fn on_delete(&mut self, time: f64) {
        self.delete(time).await;
    }

    async fn on_delete_all(&mut self) {
        self.delete_all().await;
    }

    async fn on_create_bookmark(&mut self) {
        self.create_bookmark().await;
    }
}
