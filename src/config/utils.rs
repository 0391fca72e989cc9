/// Configuration utilities - loading, reloading, and access helpers
use super::schemas::Config;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

/// Global configuration instance. Single source of truth for all config
/// values; access through [`with_config`].
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Two environment variables named in the external interfaces: absent
/// means the cloud sync worker stays disabled regardless of the stored
/// toggle.
const ENV_CLOUD_BASE_URL: &str = "LOOT_CLOUD_BASE_URL";
const ENV_CLOUD_ANON_KEY: &str = "LOOT_CLOUD_ANON_KEY";

fn apply_env_overrides(config: &mut Config) {
    if let Ok(base_url) = std::env::var(ENV_CLOUD_BASE_URL) {
        config.cloud.base_url = base_url;
    }
    if let Ok(anon_key) = std::env::var(ENV_CLOUD_ANON_KEY) {
        config.cloud.anon_key = anon_key;
    }
    if !config.cloud.has_remote() {
        config.cloud.enabled = false;
    }
}

/// Default configuration file path, under the per-user data directory.
pub fn default_config_path() -> std::path::PathBuf {
    crate::paths::get_config_path()
}

/// Load configuration from disk and initialize the global CONFIG.
/// Should be called once at startup.
pub fn load_config() -> Result<(), String> {
    load_config_from_path(&default_config_path())
}

/// Load configuration from a specific file path.
pub fn load_config_from_path(path: &std::path::Path) -> Result<(), String> {
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{:?}': {}", path, e))?;

        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("Failed to parse config file '{:?}': {}", path, e))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Reload configuration from disk, replacing the in-memory copy atomically.
pub fn reload_config() -> Result<(), String> {
    reload_config_from_path(&default_config_path())
}

/// Reload configuration from a specific file path.
pub fn reload_config_from_path(path: &std::path::Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{:?}': {}", path, e))?;

    let mut new_config = toml::from_str::<Config>(&contents)
        .map_err(|e| format!("Failed to parse config file '{:?}': {}", path, e))?;
    apply_env_overrides(&mut new_config);

    if let Some(config_lock) = CONFIG.get() {
        let mut config = config_lock
            .write()
            .map_err(|e| format!("Failed to acquire config write lock: {}", e))?;
        *config = new_config;
        Ok(())
    } else {
        Err("Config not initialized. Call load_config() first.".to_string())
    }
}

/// Execute a function with read access to the configuration.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG
        .get()
        .expect("Config not initialized. Call load_config() first.");
    let config = config_lock.read().expect("Failed to acquire config read lock");
    f(&config)
}

/// Get a clone of the entire configuration, for holding across await points.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Save the current configuration to disk.
pub fn save_config(path: Option<&std::path::Path>) -> Result<(), String> {
    let owned_default;
    let path = match path {
        Some(p) => p,
        None => {
            owned_default = default_config_path();
            owned_default.as_path()
        }
    };

    let config_str = with_config(|cfg| {
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    std::fs::write(path, config_str)
        .map_err(|e| format!("Failed to write config file '{:?}': {}", path, e))?;

    Ok(())
}

/// Check if configuration has been initialized.
pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.valuation.trade_tax_enabled, false);
        assert_eq!(config.cloud.uplink_period_secs, 60);
        assert_eq!(config.webserver.port, 7890);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tailer]"));
        assert!(toml_str.contains("[cloud]"));
    }

    #[test]
    fn no_remote_env_disables_cloud_even_if_toggled_on() {
        let mut config = Config::default();
        config.cloud.enabled = true;
        apply_env_overrides(&mut config);
        assert!(!config.cloud.enabled);
    }
}
