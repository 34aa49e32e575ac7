//! Background coordinator for Vidmarks.
//!
//! Watches tab updates and tells a tab's page context which video it now
//! shows; opens the companion panel when the toolbar icon is clicked.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::services::message_bus::MessageBus;
use crate::types::bookmark::ContentId;
use crate::types::message::{Command, ContextId, TabStatus};
use crate::types::settings::HostSettings;

/// Opens the companion side panel for a browser window.
pub trait SidePanelOpener: Send + Sync {
    fn open(&self, window_id: u64) -> Result<(), String>;
}

/// The `NEW` announcement for a tab update, if it warrants one.
///
/// Only finished loads of watch pages carrying a video id qualify.
pub fn announcement_for(status: TabStatus, url: &str, host: &HostSettings) -> Option<Command> {
    if status != TabStatus::Complete {
        return None;
    }
    let id = ContentId::from_url(url, &host.watch_marker, &host.content_param)?;
    Some(Command::New {
        video_id: id.as_str().to_string(),
    })
}

pub struct Coordinator<O: SidePanelOpener> {
    bus: Arc<MessageBus>,
    opener: O,
    host: HostSettings,
}

impl<O: SidePanelOpener> Coordinator<O> {
    pub fn new(bus: Arc<MessageBus>, opener: O, host: HostSettings) -> Self {
        Self { bus, opener, host }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Announces the tab's video to its page context. Returns the command sent.
    pub fn on_tab_updated(&self, tab_id: u64, status: TabStatus, url: &str) -> Option<Command> {
        let command = announcement_for(status, url, &self.host)?;
        match self.bus.send(ContextId::Page(tab_id), &command) {
            Ok(()) => Some(command),
            Err(e) => {
                // Usual when the page script has not attached yet.
                debug!(tab_id, error = %e, "announcement not delivered");
                None
            }
        }
    }

    pub fn on_action_clicked(&self, window_id: u64) {
        if let Err(e) = self.opener.open(window_id) {
            warn!(window_id, error = %e, "could not open side panel");
        }
    }
}
