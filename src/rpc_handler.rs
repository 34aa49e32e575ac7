//! RPC method handler for the Vidmarks host protocol.
//!
//! Kept apart from the `vidmarks-host` binary so it can be unit-tested. The
//! `handle_method` function dispatches one JSON-RPC call against the `App`.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::debug;

use crate::app::App;
use crate::managers::coordinator::announcement_for;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::{Bookmark, ContentId};
use crate::types::errors::StoreError;
use crate::types::message::{Command, TabStatus};
use crate::types::settings::RpcSettings;

const BUDGET_WINDOW: Duration = Duration::from_secs(1);

/// Fixed-window request allowance for the host's input loop.
#[derive(Debug)]
pub struct RequestBudget {
    per_window: u32,
    window_start: Instant,
    spent: u32,
}

impl RequestBudget {
    pub fn new(settings: &RpcSettings, now: Instant) -> Self {
        Self {
            per_window: settings.max_requests_per_second,
            window_start: now,
            spent: 0,
        }
    }

    /// Spends one request at `now`. Returns `false` once this second's
    /// allowance is used up; the allowance refills when the window rolls over.
    pub fn try_spend(&mut self, now: Instant) -> bool {
        if self.per_window == 0 {
            return true;
        }
        if now.duration_since(self.window_start) >= BUDGET_WINDOW {
            self.window_start = now;
            self.spent = 0;
        }
        if self.spent >= self.per_window {
            debug!(limit = self.per_window, "request budget exhausted");
            return false;
        }
        self.spent += 1;
        true
    }
}

fn video_id(params: &Value) -> Result<ContentId, String> {
    params
        .get("videoId")
        .and_then(|v| v.as_str())
        .and_then(ContentId::new)
        .ok_or_else(|| "missing videoId".to_string())
}

fn time(params: &Value) -> Result<f64, String> {
    params
        .get("time")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| "missing time".to_string())
}

fn bookmarks_json(bookmarks: &[Bookmark]) -> Result<Value, String> {
    serde_json::to_value(bookmarks).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Bookmarks ───
        "bookmarks.list" => {
            let id = video_id(params)?;
            let bookmarks = app.store.fetch(&id).await;
            Ok(json!({"videoId": id.as_str(), "items": bookmarks_json(&bookmarks)?}))
        }
        "bookmarks.add" => {
            let id = video_id(params)?;
            let t = time(params)?;
            let title = params.get("title").and_then(|v| v.as_str());
            let description = params.get("description").and_then(|v| v.as_str());
            let bookmark = Bookmark::new(t, title, description).map_err(|e| e.to_string())?;
            let bookmarks = app.store.append(&id, bookmark).await.map_err(|e| e.to_string())?;
            Ok(json!({"videoId": id.as_str(), "items": bookmarks_json(&bookmarks)?}))
        }
        "bookmarks.delete" => {
            let id = video_id(params)?;
            let t = time(params)?;
            match app.store.remove_one(&id, t).await {
                Ok(bookmarks) => Ok(json!({"removed": true, "items": bookmarks_json(&bookmarks)?})),
                Err(StoreError::NotFound(_)) => Ok(json!({"removed": false})),
                Err(e) => Err(e.to_string()),
            }
        }
        "bookmarks.clear" => {
            let id = video_id(params)?;
            app.store.remove_all(&id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Coordinator ───
        "tab.updated" => {
            let tab_id = params.get("tabId").and_then(|v| v.as_u64()).ok_or("missing tabId")?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let status: TabStatus = params
                .get("status")
                .cloned()
                .ok_or("missing status")
                .and_then(|v| serde_json::from_value(v).map_err(|_| "invalid status"))?;
            let command = announcement_for(status, url, &app.host_settings());
            Ok(json!({"tabId": tab_id, "command": command.map(|c| c.to_value())}))
        }
        "command.parse" => {
            let message = params.get("message").ok_or("missing message")?;
            let command = Command::from_value(message).map_err(|e| e.to_string())?;
            Ok(command.to_value())
        }

        // ─── Session ───
        "session.status" => {
            use crate::services::lifecycle_guard::LifecycleGuard;
            Ok(json!({"valid": app.session.is_valid()}))
        }
        "session.invalidate" => {
            app.session.invalidate();
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => serde_json::to_value(app.settings()).map_err(|e| e.to_string()),
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut engine = app.settings_engine.lock().map_err(|e| e.to_string())?;
            engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
