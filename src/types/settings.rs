use serde::{Deserialize, Serialize};

/// Top-level settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtensionSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub rpc: RpcSettings,
}

/// Where bookmark lists are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// SQLite file name, relative to the platform data directory.
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "vidmarks.db".to_string(),
        }
    }
}

/// How the host video page is recognised and where the overlay attaches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSettings {
    /// Substring a URL must contain to count as a watch page.
    pub watch_marker: String,
    /// Query parameter holding the video id.
    pub content_param: String,
    /// Fallback selectors for the control bar, first match wins.
    pub control_bar_selectors: Vec<String>,
    /// Fallback selectors for the media element, first match wins.
    pub media_selectors: Vec<String>,
    /// Bundled icon used for the overlay control.
    pub control_icon: String,
    pub control_tooltip: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            watch_marker: "youtube.com/watch".to_string(),
            content_param: "v".to_string(),
            control_bar_selectors: vec![
                ".ytp-left-controls".to_string(),
                ".ytp-chrome-controls .ytp-left-controls".to_string(),
                "#movie_player .ytp-chrome-bottom".to_string(),
            ],
            media_selectors: vec![
                "video.video-stream".to_string(),
                ".html5-main-video".to_string(),
                "#movie_player video".to_string(),
            ],
            control_icon: "icons/bookmark.png".to_string(),
            control_tooltip: "Click to bookmark current timestamp".to_string(),
        }
    }
}

/// Diagnostic output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "vidmarks=info".to_string(),
        }
    }
}

/// Limits applied by the stdin RPC host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcSettings {
    /// Requests accepted per one-second window; `0` disables the limit.
    pub max_requests_per_second: u32,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_requests_per_second: 200,
        }
    }
}
