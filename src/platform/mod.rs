// Vidmarks platform paths
// Config and data directories per OS, chosen at compile time.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "vidmarks";

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
}

/// Returns the configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/vidmarks`, else `~/.config/vidmarks`
/// - **macOS**: `~/Library/Application Support/vidmarks`
/// - **Windows**: `%APPDATA%/vidmarks`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir())
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".config"))
            .join(APP_DIR)
    }
}

/// Returns the data directory holding the bookmark database.
///
/// - **Linux**: `$XDG_DATA_HOME/vidmarks`, else `~/.local/share/vidmarks`
/// - **macOS / Windows**: same as the config directory
pub fn get_data_dir() -> PathBuf {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".local").join("share"))
            .join(APP_DIR)
    }
}
