/// Runtime logger configuration system
///
/// This module manages the logger's runtime state, including:
/// - Which log levels to show
/// - Which modules have debug mode enabled (from --debug-<module> flags)
/// - Output settings (console, file, colors)
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Logger runtime configuration
#[derive(Clone)]
pub struct LoggerConfig {
    /// Minimum log level to display (filters out lower priority logs)
    pub min_level: LogLevel,

    /// Per-module debug mode flags (populated from command-line arguments)
    pub debug_modes: HashMap<String, bool>,

    /// Per-module verbose mode flags (populated from command-line arguments)
    pub verbose_modes: HashMap<String, bool>,

    /// Specific tags to enable (empty = all enabled)
    pub enabled_tags: HashSet<String>,

    pub console_enabled: bool,
    pub file_enabled: bool,
    pub colors_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_modes: HashMap::new(),
            verbose_modes: HashMap::new(),
            enabled_tags: HashSet::new(),
            console_enabled: true,
            file_enabled: true,
            colors_enabled: true,
        }
    }
}

/// Known debug/verbose module keys, matching `LogTag::to_debug_key()`.
const KNOWN_MODULES: &[&str] = &[
    "tailer",
    "parser",
    "exchange",
    "delta",
    "segmenter",
    "player",
    "collector",
    "valuation",
    "cloud",
    "store",
    "http",
    "system",
];

/// Global logger configuration singleton
static LOGGER_CONFIG: Lazy<Arc<RwLock<LoggerConfig>>> =
    Lazy::new(|| Arc::new(RwLock::new(LoggerConfig::default())));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Set the logger configuration (replaces entire config)
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// Update logger configuration with a closure
pub fn update_logger_config<F>(f: F)
where
    F: FnOnce(&mut LoggerConfig),
{
    let mut config = LOGGER_CONFIG.write().unwrap_or_else(|e| e.into_inner());
    f(&mut config);
}

/// Initialize logger configuration from raw command-line arguments.
///
/// Scans `--debug-<module>`, `--verbose-<module>`, `--verbose`/`-v`, and
/// `--quiet`/`-q` out of whatever was passed to the process, independent of
/// clap's own subcommand parsing (the CLI may reject flags it doesn't
/// recognize, but the logger always wants to see debug/verbose toggles).
pub fn init_from_args() {
    init_from(std::env::args().skip(1));
}

pub fn init_from<I: IntoIterator<Item = String>>(args: I) {
    let mut config = LoggerConfig::default();
    let args: Vec<String> = args.into_iter().collect();

    for arg in &args {
        if let Some(module) = arg.strip_prefix("--debug-") {
            if KNOWN_MODULES.contains(&module) {
                config.debug_modes.insert(module.to_string(), true);
            }
        } else if let Some(module) = arg.strip_prefix("--verbose-") {
            if KNOWN_MODULES.contains(&module) {
                config.verbose_modes.insert(module.to_string(), true);
            }
        }
    }

    if args.iter().any(|a| a == "--verbose" || a == "-v") {
        config.min_level = LogLevel::Verbose;
    }

    if args.iter().any(|a| a == "--quiet" || a == "-q") {
        config.min_level = LogLevel::Warning;
    }

    set_logger_config(config);
}

/// Check if debug mode is enabled for a specific tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    let tag_name = tag.to_debug_key();
    config.debug_modes.get(&tag_name).copied().unwrap_or(false)
}

/// Check if verbose mode is enabled for a specific tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    let tag_name = tag.to_debug_key();
    config
        .verbose_modes
        .get(&tag_name)
        .copied()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_debug_and_verbose_flags() {
        init_from(
            vec!["--debug-tailer".to_string(), "--verbose-cloud".to_string()].into_iter(),
        );
        assert!(is_debug_enabled_for_tag(&LogTag::Tailer));
        assert!(is_verbose_enabled_for_tag(&LogTag::Cloud));
        assert!(!is_debug_enabled_for_tag(&LogTag::Cloud));
    }

    #[test]
    fn quiet_raises_min_level_to_warning() {
        init_from(vec!["--quiet".to_string()].into_iter());
        assert_eq!(get_logger_config().min_level, LogLevel::Warning);
    }
}
