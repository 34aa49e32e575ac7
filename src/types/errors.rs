use std::fmt;

// === StorageError ===

/// Errors reported by a key-value store backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The backend could not be reached or refused the call.
    Unavailable(String),
    /// A database operation failed.
    DatabaseError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

// === StoreError ===

/// Errors surfaced by timestamp store mutations.
///
/// Reads never return these; they degrade to an empty list instead.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The owning session is no longer valid; the store was not touched.
    SessionInvalid,
    /// The underlying store call failed.
    StoreUnavailable(String),
    /// The persisted list for the given video could not be decoded.
    Corrupt(String),
    /// No bookmark matched the requested time.
    NotFound(f64),
    /// The bookmark to save is not valid.
    InvalidBookmark(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::SessionInvalid => write!(f, "Session is no longer valid"),
            StoreError::StoreUnavailable(msg) => write!(f, "Bookmark store unavailable: {}", msg),
            StoreError::Corrupt(id) => write!(f, "Stored bookmarks are corrupt for video: {}", id),
            StoreError::NotFound(time) => write!(f, "No bookmark at time: {}", time),
            StoreError::InvalidBookmark(msg) => write!(f, "Invalid bookmark: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::StoreUnavailable(e.to_string())
    }
}

// === MessageError ===

/// Errors related to cross-context command messages.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageError {
    /// The message could not be decoded into a known command.
    Malformed(String),
    /// The session was invalid when the message was sent or received.
    SessionInvalid,
    /// No context is listening at the target address.
    NoReceiver(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Malformed(msg) => write!(f, "Malformed message: {}", msg),
            MessageError::SessionInvalid => write!(f, "Messaging unavailable: session is no longer valid"),
            MessageError::NoReceiver(target) => write!(f, "No receiver for context: {}", target),
        }
    }
}

impl std::error::Error for MessageError {}

// === AnchorError ===

/// Errors raised while locating host page anchors.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorError {
    /// The required anchors did not appear before the deadline.
    Timeout { waited_ms: u64 },
    /// The overlay control could not be inserted into the anchor.
    InsertRejected(String),
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorError::Timeout { waited_ms } => {
                write!(f, "Page anchors not found after {} ms", waited_ms)
            }
            AnchorError::InsertRejected(msg) => write!(f, "Overlay control insert rejected: {}", msg),
        }
    }
}

impl std::error::Error for AnchorError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
