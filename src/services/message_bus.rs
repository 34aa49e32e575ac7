//! Cross-context message channel.
//!
//! Each context registers once and receives raw JSON messages on its own
//! unbounded queue. Sending is fire-and-forget: no reply is awaited, and a
//! missing receiver is reported to the sender only.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::services::lifecycle_guard::{LifecycleGuard, SessionHandle};
use crate::types::errors::MessageError;
use crate::types::message::{Command, ContextId};

pub struct MessageBus {
    routes: Mutex<HashMap<ContextId, mpsc::UnboundedSender<Value>>>,
    session: SessionHandle,
}

impl MessageBus {
    pub fn new(session: SessionHandle) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            session,
        }
    }

    /// Registers `context` and returns its inbox, replacing any earlier registration.
    pub fn register(&self, context: ContextId) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.routes.lock() {
            Ok(mut routes) => {
                if routes.insert(context, tx).is_some() {
                    debug!(%context, "context re-registered");
                }
            }
            Err(e) => debug!(%context, error = %e, "message routes poisoned"),
        }
        rx
    }

    pub fn unregister(&self, context: ContextId) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(&context);
        }
    }

    /// Sends a typed command to `target`.
    pub fn send(&self, target: ContextId, command: &Command) -> Result<(), MessageError> {
        self.send_raw(target, command.to_value())
    }

    /// Sends an already-encoded message to `target`.
    ///
    /// # Errors
    /// `SessionInvalid` when the session is gone, `NoReceiver` when nothing
    /// is registered at `target` or its inbox was dropped.
    pub fn send_raw(&self, target: ContextId, message: Value) -> Result<(), MessageError> {
        if !self.session.is_valid() {
            return Err(MessageError::SessionInvalid);
        }
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| MessageError::NoReceiver(target.to_string()))?;
        let Some(tx) = routes.get(&target) else {
            return Err(MessageError::NoReceiver(target.to_string()));
        };
        if tx.send(message).is_err() {
            routes.remove(&target);
            return Err(MessageError::NoReceiver(target.to_string()));
        }
        Ok(())
    }
}
