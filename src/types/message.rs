use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::MessageError;

/// Commands exchanged between the coordinator, the panel and the page.
///
/// Wire shape is a tagged JSON object, e.g. `{"type":"JUMP","value":42.0}`
/// or `{"type":"NEW","videoId":"abc123"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Coordinator: the tab is now showing `video_id`.
    #[serde(rename = "NEW")]
    New {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    /// Panel: seek the page's media element to `value` seconds.
    #[serde(rename = "JUMP")]
    Jump { value: f64 },
    /// Panel: delete the bookmark at `value` seconds.
    #[serde(rename = "DELETE")]
    Delete { value: f64 },
    /// Panel: delete every bookmark of the current video.
    #[serde(rename = "DELETEALL")]
    DeleteAll,
    /// Panel: bookmark the current playback position.
    #[serde(rename = "CREATE_BOOKMARK")]
    CreateBookmark,
}

impl Command {
    /// Decodes and validates a raw wire message.
    ///
    /// # Errors
    /// Returns `MessageError::Malformed` for unknown tags, missing fields,
    /// blank video ids and negative or non-finite times.
    pub fn from_value(raw: &serde_json::Value) -> Result<Self, MessageError> {
        let command: Command = serde_json::from_value(raw.clone())
            .map_err(|e| MessageError::Malformed(e.to_string()))?;
        command.validate()?;
        Ok(command)
    }

    fn validate(&self) -> Result<(), MessageError> {
        match self {
            Command::New { video_id } if video_id.trim().is_empty() => {
                Err(MessageError::Malformed("NEW without videoId".to_string()))
            }
            Command::Jump { value } | Command::Delete { value } if !value.is_finite() || *value < 0.0 => {
                Err(MessageError::Malformed(format!("{} with invalid time {}", self.tag(), value)))
            }
            _ => Ok(()),
        }
    }

    /// Wire tag of this command.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::New { .. } => "NEW",
            Command::Jump { .. } => "JUMP",
            Command::Delete { .. } => "DELETE",
            Command::DeleteAll => "DELETEALL",
            Command::CreateBookmark => "CREATE_BOOKMARK",
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Serializing a plain enum of strings and floats cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Address of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    Coordinator,
    Panel,
    /// The page-embedded component of one browser tab.
    Page(u64),
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Coordinator => write!(f, "coordinator"),
            ContextId::Panel => write!(f, "panel"),
            ContextId::Page(tab) => write!(f, "page:{}", tab),
        }
    }
}

/// Load status reported for a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Snapshot of a browser tab as seen by the coordinator and the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub tab_id: u64,
    pub window_id: u64,
    pub url: String,
}
