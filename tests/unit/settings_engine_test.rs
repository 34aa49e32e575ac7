//! Unit tests for the Vidmarks settings engine.

use serde_json::json;
use tempfile::TempDir;

use vidmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use vidmarks::types::errors::SettingsError;
use vidmarks::types::settings::ExtensionSettings;

fn engine_in(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("config").join("settings.json");
    SettingsEngine::new(Some(path.to_string_lossy().to_string()))
}

#[test]
fn test_set_value_persists_across_engines() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    engine.load().unwrap();

    engine.set_value("host.content_param", json!("vid")).unwrap();
    engine.set_value("logging.filter", json!("vidmarks=debug")).unwrap();

    let mut reopened = engine_in(&dir);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.host.content_param, "vid");
    assert_eq!(loaded.logging.filter, "vidmarks=debug");
}

#[test]
fn test_selector_lists_can_be_replaced() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);

    engine
        .set_value("host.media_selectors", json!(["video#main", "video"]))
        .unwrap();

    assert_eq!(
        engine.get_settings().host.media_selectors,
        vec!["video#main".to_string(), "video".to_string()]
    );
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(
        engine.get_config_path(),
        r#"{"storage": {"database_file": "other.db"}}"#,
    )
    .unwrap();

    let loaded = engine.load().unwrap();

    assert_eq!(loaded.storage.database_file, "other.db");
    assert_eq!(loaded.host, ExtensionSettings::default().host);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(engine.get_config_path(), "{ not json").unwrap();

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_empty_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);

    assert!(matches!(engine.set_value("", json!(1)), Err(SettingsError::InvalidKey(_))));
}

#[test]
fn test_reset_restores_defaults_on_disk() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    engine.set_value("host.watch_marker", json!("example.com/play")).unwrap();

    engine.reset().unwrap();

    let mut reopened = engine_in(&dir);
    assert_eq!(reopened.load().unwrap(), ExtensionSettings::default());
}

#[test]
fn test_failed_write_keeps_previous_settings() {
    let dir = TempDir::new().unwrap();
    // A plain file where the config directory should be makes every save fail.
    let blocker = dir.path().join("config");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut engine = engine_in(&dir);
    engine.load().unwrap();

    let result = engine.set_value("host.content_param", json!("vid"));

    assert!(matches!(result, Err(SettingsError::IoError(_))));
    assert_eq!(engine.get_settings().host.content_param, "v");
    assert_eq!(*engine.get_settings(), ExtensionSettings::default());
}

#[test]
fn test_failed_reset_keeps_previous_settings() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(&dir);
    engine.set_value("logging.filter", json!("vidmarks=debug")).unwrap();

    // Swap the config directory for a plain file.
    std::fs::remove_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(dir.path().join("config"), "not a directory").unwrap();

    assert!(matches!(engine.reset(), Err(SettingsError::IoError(_))));
    assert_eq!(engine.get_settings().logging.filter, "vidmarks=debug");
}
