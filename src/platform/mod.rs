// Passdrop platform paths
// Resolves where the settings file and the SQLite database live. The
// `PASSDROP_CONFIG` and `PASSDROP_DATA_DIR` environment variables take
// precedence over the per-OS defaults.

use std::env;
use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Overrides the data directory (database location).
pub const DATA_DIR_ENV: &str = "PASSDROP_DATA_DIR";
/// Overrides the full path of the settings file.
pub const CONFIG_FILE_ENV: &str = "PASSDROP_CONFIG";

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/passdrop` or `~/.config/passdrop`
/// - **macOS**: `~/Library/Application Support/Passdrop`
/// - **Windows**: `%APPDATA%/Passdrop`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the data directory, honouring `PASSDROP_DATA_DIR`.
///
/// - **Linux**: `$XDG_DATA_HOME/passdrop` or `~/.local/share/passdrop`
/// - **macOS**: `~/Library/Application Support/Passdrop`
/// - **Windows**: `%LOCALAPPDATA%/Passdrop`
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}

/// Explicit settings file from `PASSDROP_CONFIG`, if set.
pub fn config_file_override() -> Option<String> {
    non_empty_env(CONFIG_FILE_ENV)
}
