//! Structured logging for the engine.
//!
//! - Automatic debug/verbose filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-component debug control via --debug-<module> flags
//! - Dual output: colored console + rotating file
//!
//! ## Usage
//!
//! ```ignore
//! use lootwarden::logger::{self, LogTag};
//!
//! logger::error(LogTag::Store, "failed to open database");
//! logger::warning(LogTag::Cloud, "uplink rate limited");
//! logger::info(LogTag::Collector, "run opened");
//! logger::debug(LogTag::Tailer, "rotation detected"); // only with --debug-tailer
//! logger::verbose(LogTag::Parser, "raw line: ..."); // only with --verbose
//! ```
//!
//! Call [`init`] once at startup, before any logging occurs.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system: debug-flag parsing, then file logging.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only shown with --debug-<module>)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only shown with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes. Call during shutdown.
pub fn flush() {
    file::flush_file_logging();
}
