//! Companion panel for Vidmarks.
//!
//! Shows the bookmarks of the video in the active tab and turns the user's
//! clicks into commands for that tab's page context. Rendering the view
//! model is left to the panel's UI layer.

use std::sync::Arc;

use tracing::debug;

use crate::database::kv_store::KeyValueStore;
use crate::services::message_bus::MessageBus;
use crate::services::timestamp_store::TimestampStore;
use crate::types::bookmark::{format_timestamp, Bookmark, ContentId};
use crate::types::errors::MessageError;
use crate::types::message::{Command, ContextId, TabInfo};
use crate::types::settings::HostSettings;

/// One rendered bookmark line.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkRow {
    pub time: f64,
    /// `HH:MM:SS` label.
    pub label: String,
    pub title: String,
    pub description: String,
}

impl From<&Bookmark> for BookmarkRow {
    fn from(b: &Bookmark) -> Self {
        Self {
            time: b.time,
            label: format_timestamp(b.time),
            title: b.title.clone(),
            description: b.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    /// The active tab is not a video page.
    NotAVideoPage,
    Bookmarks { video_id: ContentId, rows: Vec<BookmarkRow> },
}

pub struct PanelController<S: KeyValueStore> {
    store: TimestampStore<S>,
    bus: Arc<MessageBus>,
    host: HostSettings,
    active_tab: Option<u64>,
    view: PanelView,
}

impl<S: KeyValueStore + 'static> PanelController<S> {
    pub fn new(store: TimestampStore<S>, bus: Arc<MessageBus>, host: HostSettings) -> Self {
        Self {
            store,
            bus,
            host,
            active_tab: None,
            view: PanelView::NotAVideoPage,
        }
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    /// Loads the view for the active tab.
    pub async fn open(&mut self, tab: &TabInfo) -> &PanelView {
        self.active_tab = Some(tab.tab_id);
        self.view = match ContentId::from_url(&tab.url, &self.host.watch_marker, &self.host.content_param) {
            Some(video_id) => {
                let bookmarks = self.store.fetch(&video_id).await;
                Self::bookmarks_view(video_id, &bookmarks)
            }
            None => PanelView::NotAVideoPage,
        };
        &self.view
    }

    fn bookmarks_view(video_id: ContentId, bookmarks: &[Bookmark]) -> PanelView {
        PanelView::Bookmarks {
            video_id,
            rows: bookmarks.iter().map(BookmarkRow::from).collect(),
        }
    }

    /// Re-renders if the change concerns the shown video. Returns whether it did.
    pub fn apply_change(&mut self, id: &ContentId, bookmarks: &[Bookmark]) -> bool {
        match &self.view {
            PanelView::Bookmarks { video_id, .. } if video_id == id => {
                self.view = Self::bookmarks_view(id.clone(), bookmarks);
                true
            }
            _ => false,
        }
    }

    pub fn jump(&self, time: f64) -> Result<(), MessageError> {
        self.send(Command::Jump { value: time })
    }

    pub fn delete(&self, time: f64) -> Result<(), MessageError> {
        self.send(Command::Delete { value: time })
    }

    pub fn delete_all(&self) -> Result<(), MessageError> {
        self.send(Command::DeleteAll)
    }

    pub fn create(&self) -> Result<(), MessageError> {
        self.send(Command::CreateBookmark)
    }

    /// Sends `command` to the active tab's page context.
    ///
    /// Refused while the tab shows no video.
    fn send(&self, command: Command) -> Result<(), MessageError> {
        let Some(tab) = self.active_tab else {
            return Err(MessageError::NoReceiver("no active tab".to_string()));
        };
        if self.view == PanelView::NotAVideoPage {
            debug!(tab, tag = command.tag(), "panel command refused: no video");
            return Err(MessageError::NoReceiver(format!("tab {tab} shows no video")));
        }
        debug!(tab, tag = command.tag(), "panel command");
        self.bus.send(ContextId::Page(tab), &command)
    }
}
