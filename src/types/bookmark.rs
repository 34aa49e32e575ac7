use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::errors::StoreError;

/// One saved timestamp on a video.
///
/// Serialized with camelCase keys so the persisted list stays readable by the
/// page-side scripts: `{"time":42.0,"title":"..","description":"","createdAt":".."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub time: f64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Builds a bookmark at `time` seconds, defaulting the title to
    /// `Bookmark at HH:MM:SS` when none (or a blank one) is supplied.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidBookmark` if `time` is negative, NaN or infinite.
    pub fn new(time: f64, title: Option<&str>, description: Option<&str>) -> Result<Self, StoreError> {
        if !time.is_finite() || time < 0.0 {
            return Err(StoreError::InvalidBookmark(format!("time must be a non-negative number, got {}", time)));
        }

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_title(time),
        };

        Ok(Self {
            time,
            title,
            description: description.unwrap_or_default().to_string(),
            created_at: Utc::now(),
        })
    }

    /// Shorthand for a bookmark with the default title and no description.
    pub fn at(time: f64) -> Result<Self, StoreError> {
        Self::new(time, None, None)
    }
}

/// Title given to bookmarks created without one.
pub fn default_title(time: f64) -> String {
    format!("Bookmark at {}", format_timestamp(time))
}

/// Formats a playback position as `HH:MM:SS`, truncating fractional seconds.
///
/// Hours are not wrapped, so a ten-hour stream shows `10:00:00`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Sorts a bookmark list ascending by `time`. Stable, so equal times keep
/// their insertion order.
pub fn sort_by_time(bookmarks: &mut [Bookmark]) {
    bookmarks.sort_by(|a, b| a.time.total_cmp(&b.time));
}

/// Opaque identifier of one playable video, taken from the page URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Wraps a raw identifier. Blank identifiers are rejected.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Extracts the identifier from a watch-page URL.
    ///
    /// Returns `None` unless `url` contains `watch_marker` and carries a
    /// non-empty `param` query parameter.
    pub fn from_url(url: &str, watch_marker: &str, param: &str) -> Option<Self> {
        if !url.contains(watch_marker) {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        let value = parsed
            .query_pairs()
            .find(|(k, _)| k == param)
            .map(|(_, v)| v.into_owned())?;
        Self::new(&value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
