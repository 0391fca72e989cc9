//! Centralized path resolution.
//!
//! All file and directory paths are resolved through this module so behavior
//! stays consistent across platforms and between normal and portable mode.
//!
//! ## Path Strategy
//!
//! - **macOS**: `~/Library/Application Support/LootWarden/`
//! - **Windows**: `%LOCALAPPDATA%\LootWarden\`
//! - **Linux**: `$XDG_DATA_HOME/LootWarden/` (fallback `~/.local/share/LootWarden/`)
//!
//! In portable mode the base directory is instead resolved beside the
//! running executable, per the CLI's `--portable` flag.
//!
//! ## Directory Structure
//!
//! ```text
//! LootWarden/
//! ├── data/
//! │ ├── config.toml
//! │ ├── lootwarden.db
//! │ ├── device_uuid
//! │ └── .lootwarden.lock
//! └── logs/
//!     └── lootwarden.log[.N]
//! ```

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

const APP_DIR: &str = "LootWarden";

static PORTABLE: AtomicBool = AtomicBool::new(false);
static BASE_DIRECTORY: OnceCell<PathBuf> = OnceCell::new();

/// Must be called before any path accessor, once, from CLI startup, with
/// whether `--portable` was passed.
pub fn set_portable_mode(portable: bool) {
    PORTABLE.store(portable, Ordering::SeqCst);
}

fn resolve_base_directory() -> PathBuf {
    if PORTABLE.load(Ordering::SeqCst) {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        return exe_dir.join(APP_DIR);
    }

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_DIR);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }
    PathBuf::from(APP_DIR)
}

fn base_directory() -> &'static PathBuf {
    BASE_DIRECTORY.get_or_init(resolve_base_directory)
}

/// Root directory where all data, logs, and the device UUID are stored.
pub fn get_base_directory() -> PathBuf {
    base_directory().clone()
}

/// Contains the Store database, config file, device UUID, and lock file.
pub fn get_data_directory() -> PathBuf {
    base_directory().join("data")
}

/// Contains the rotating log file and its backups.
pub fn get_logs_directory() -> PathBuf {
    base_directory().join("logs")
}

/// Main configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

/// Canonical Store database file path.
pub fn get_store_db_path() -> PathBuf {
    get_data_directory().join("lootwarden.db")
}

/// Deprecated single-file-version Store location, probed once at startup
/// and one-shot copied into the canonical location if found (§6).
pub fn get_legacy_store_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR).join("tracker.db"))
}

/// Persisted device UUID (generated once, never re-derived).
pub fn get_device_uuid_path() -> PathBuf {
    get_data_directory().join("device_uuid")
}

/// Single-instance advisory lock file.
pub fn get_process_lock_path() -> PathBuf {
    get_data_directory().join(".lootwarden.lock")
}

/// Ensures the base/data/logs directories exist. Call once at startup.
pub fn ensure_all_directories() -> Result<(), String> {
    for dir in [get_base_directory(), get_data_directory(), get_logs_directory()] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_directory_not_empty() {
        let base = get_base_directory();
        assert!(!base.as_os_str().is_empty());
    }

    #[test]
    fn data_and_logs_are_subdirs_of_base() {
        let base = get_base_directory();
        assert!(get_data_directory().starts_with(&base));
        assert!(get_logs_directory().starts_with(&base));
    }

    #[test]
    fn config_and_store_paths_are_in_data_dir() {
        let data = get_data_directory();
        assert!(get_config_path().starts_with(&data));
        assert_eq!(get_config_path().file_name().unwrap(), "config.toml");
        assert!(get_store_db_path().starts_with(&data));
    }

    #[test]
    fn lock_path_is_hidden_and_in_data_dir() {
        let lock = get_process_lock_path();
        assert!(lock.starts_with(get_data_directory()));
        assert_eq!(lock.file_name().unwrap(), ".lootwarden.lock");
    }
}
