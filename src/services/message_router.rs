//! Message Router for Vidmarks.
//!
//! Decodes inbound wire messages into [`Command`]s and dispatches them to a
//! [`CommandHandler`] by exhaustive match. Nothing inbound ever escapes as an
//! error: invalid sessions and malformed messages are dropped and logged.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use crate::services::lifecycle_guard::{LifecycleGuard, SessionHandle};
use crate::types::bookmark::ContentId;
use crate::types::errors::MessageError;
use crate::types::message::Command;

/// Receiver side of the command protocol.
pub trait CommandHandler: Send {
    fn on_new(&mut self, id: ContentId) -> impl Future<Output = ()> + Send;
    fn on_jump(&mut self, time: f64) -> impl Future<Output = ()> + Send;
    fn on_delete(&mut self, time: f64) -> impl Future<Output = ()> + Send;
    fn on_delete_all(&mut self) -> impl Future<Output = ()> + Send;
    fn on_create_bookmark(&mut self) -> impl Future<Output = ()> + Send;
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Dispatched(&'static str),
    Dropped(MessageError),
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    session: SessionHandle,
}

impl MessageRouter {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// Validates `raw` and hands the decoded command to `handler`.
    pub async fn route<H: CommandHandler>(&self, handler: &mut H, raw: &Value) -> RouteOutcome {
        if !self.session.is_valid() {
            debug!("inbound message dropped: session invalid");
            return RouteOutcome::Dropped(MessageError::SessionInvalid);
        }

        let command = match Command::from_value(raw) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                return RouteOutcome::Dropped(e);
            }
        };
        let tag = command.tag();
        debug!(tag, "dispatching command");

        match command {
            Command::New { video_id } => match ContentId::new(&video_id) {
                Some(id) => handler.on_new(id).await,
                None => return RouteOutcome::Dropped(MessageError::Malformed("NEW without videoId".to_string())),
            },
            Command::Jump { value } => handler.on_jump(value).await,
            Command::Delete { value } => handler.on_delete(value).await,
            Command::DeleteAll => handler.on_delete_all().await,
            Command::CreateBookmark => handler.on_create_bookmark().await,
        }
        RouteOutcome::Dispatched(tag)
    }
}
