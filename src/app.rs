//! App Core for Vidmarks.
//!
//! Wires the host-side pieces together: one session handle, the SQLite-backed
//! bookmark store, the message bus and the settings engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::database::kv_store::SqliteKvStore;
use crate::platform;
use crate::services::lifecycle_guard::SessionHandle;
use crate::services::message_bus::MessageBus;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::timestamp_store::TimestampStore;
use crate::types::settings::{ExtensionSettings, HostSettings};

pub struct App {
    pub session: SessionHandle,
    pub store: TimestampStore<SqliteKvStore>,
    pub bus: Arc<MessageBus>,
    pub settings_engine: Mutex<SettingsEngine>,
}

impl App {
    /// Opens the store at `db_path`.
    ///
    /// `settings_engine` is used as given; the caller decides whether and
    /// when it was loaded from disk.
    pub fn new(db_path: &str, settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let session = SessionHandle::new();
        let kv = SqliteKvStore::open(db_path)?;
        let store = TimestampStore::new(Arc::new(kv), session.clone());
        let bus = Arc::new(MessageBus::new(session.clone()));
        info!(db = db_path, "bookmark store opened");

        Ok(Self {
            session,
            store,
            bus,
            settings_engine: Mutex::new(settings_engine),
        })
    }

    /// Database location: `$VIDMARKS_DATA_DIR`, else the platform data dir.
    pub fn default_db_path(settings: &ExtensionSettings) -> PathBuf {
        let dir = std::env::var("VIDMARKS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| platform::get_data_dir());
        dir.join(&settings.storage.database_file)
    }

    pub fn settings(&self) -> ExtensionSettings {
        self.settings_engine
            .lock()
            .map(|engine| engine.get_settings().clone())
            .unwrap_or_default()
    }

    pub fn host_settings(&self) -> HostSettings {
        self.settings().host
    }
}
