// Vidmarks Settings Engine
// Loads, saves and updates the extension settings JSON file.
// The file lives at the platform config path unless overridden.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ExtensionSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ExtensionSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ExtensionSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine that persists settings as pretty JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: ExtensionSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// Uses `path_override` when given, otherwise `settings.json` in the
    /// platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string()
        });

        Self {
            config_path,
            settings: ExtensionSettings::default(),
        }
    }

    /// Installs `updated` only once it is on disk. On a failed write the
    /// previous settings stay in effect.
    fn commit(&mut self, updated: ExtensionSettings) -> Result<(), SettingsError> {
        let previous = std::mem::replace(&mut self.settings, updated);
        if let Err(e) = self.save() {
            self.settings = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from disk, falling back to defaults when the file is absent.
    ///
    /// A present but malformed file is an error rather than a silent reset.
    fn load(&mut self) -> Result<ExtensionSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = ExtensionSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        info!(path = %self.config_path, "settings loaded");
        Ok(self.settings.clone())
    }

    /// Writes the current settings, creating parent directories as needed.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &ExtensionSettings {
        &self.settings
    }

    /// Updates one setting by dot-notation path and saves.
    ///
    /// `"host.content_param"` updates `settings.host.content_param`. The key
    /// must already exist, and the result must still deserialize.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(SettingsError::InvalidKey(format!("'{}'", key)));
        }

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let pointer = format!("/{}", key.replace('.', "/"));
        let slot = json_value
            .pointer_mut(&pointer)
            .ok_or_else(|| SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)))?;
        *slot = value;

        let updated = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.commit(updated)
    }

    /// Resets all settings to defaults and saves.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.commit(ExtensionSettings::default())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
