//! File logging implementation with size-based rotation and cleanup
//!
//! Handles writing logs to disk with:
//! - Rotation once the current file exceeds a size threshold
//! - A fixed number of rotated backups retained, oldest discarded
//! - Buffered I/O for performance
//! - Thread-safe concurrent writes

use once_cell::sync::Lazy;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const ENABLE_FILE_LOGGING: bool = true;
/// Rotate once the active log file reaches this size, per the persisted
/// state layout's "rotate at 5 MiB, keep 3" contract.
const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
/// Number of rotated backups kept alongside the active file.
const MAX_BACKUPS: usize = 3;

const FLUSH_INTERVAL_WRITES: u64 = 1;
const FILE_BUFFER_SIZE: usize = 4 * 1024;

const LOG_FILE_NAME: &str = "lootwarden.log";

/// File logger state for thread-safe file operations
struct FileLogger {
    file_writer: Option<BufWriter<File>>,
    log_dir: PathBuf,
    log_path: PathBuf,
    bytes_written: u64,
    write_counter: u64,
}

impl FileLogger {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let log_dir = get_log_directory()?;
        fs::create_dir_all(&log_dir)?;

        let log_path = log_dir.join(LOG_FILE_NAME);
        let bytes_written = fs::metadata(&log_path).map(|m| m.len()).unwrap_or(0);

        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        let file_writer = Some(BufWriter::with_capacity(FILE_BUFFER_SIZE, file));

        Ok(FileLogger {
            file_writer,
            log_dir,
            log_path,
            bytes_written,
            write_counter: 0,
        })
    }

    fn write_to_file(&mut self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.bytes_written >= ROTATE_AT_BYTES {
            self.rotate()?;
        }

        if let Some(ref mut writer) = self.file_writer {
            let line = format!("{}\n", message);
            writer.write_all(line.as_bytes())?;
            self.bytes_written += line.len() as u64;

            self.write_counter += 1;
            if self.write_counter % FLUSH_INTERVAL_WRITES == 0 {
                writer.flush()?;
            }
        }

        Ok(())
    }

    /// Shift `lootwarden.log` -> `lootwarden.log.1` -> ... -> `lootwarden.log.3`,
    /// dropping whatever was in the oldest slot, then start a fresh active file.
    fn rotate(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut writer) = self.file_writer.take() {
            let _ = writer.flush();
        }

        let oldest = self.log_dir.join(format!("{}.{}", LOG_FILE_NAME, MAX_BACKUPS));
        let _ = fs::remove_file(&oldest);

        for i in (1..MAX_BACKUPS).rev() {
            let from = self.log_dir.join(format!("{}.{}", LOG_FILE_NAME, i));
            let to = self.log_dir.join(format!("{}.{}", LOG_FILE_NAME, i + 1));
            if from.exists() {
                let _ = fs::rename(&from, &to);
            }
        }

        let first_backup = self.log_dir.join(format!("{}.1", LOG_FILE_NAME));
        let _ = fs::rename(&self.log_path, &first_backup);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        self.file_writer = Some(BufWriter::with_capacity(FILE_BUFFER_SIZE, file));
        self.bytes_written = 0;

        Ok(())
    }
}

/// Global file logger instance
static FILE_LOGGER: Lazy<Arc<Mutex<Option<FileLogger>>>> = Lazy::new(|| {
    if ENABLE_FILE_LOGGING {
        match FileLogger::new() {
            Ok(logger) => Arc::new(Mutex::new(Some(logger))),
            Err(e) => {
                eprintln!("Failed to initialize file logger: {}", e);
                Arc::new(Mutex::new(None))
            }
        }
    } else {
        Arc::new(Mutex::new(None))
    }
});

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = crate::paths::get_logs_directory();

    if log_dir.exists() || fs::create_dir_all(&log_dir).is_ok() {
        return Ok(log_dir);
    }

    let temp_log_dir = std::env::temp_dir().join("lootwarden_logs");
    fs::create_dir_all(&temp_log_dir)?;
    Ok(temp_log_dir)
}

/// Initialize the file logging system
pub fn init_file_logging() {
    if ENABLE_FILE_LOGGING {
        Lazy::force(&FILE_LOGGER);
    }
}

/// Force flush all pending log writes (call during shutdown)
pub fn flush_file_logging() {
    if !ENABLE_FILE_LOGGING {
        return;
    }

    if let Ok(mut logger_guard) = FILE_LOGGER.lock() {
        if let Some(ref mut logger) = logger_guard.as_mut() {
            if let Some(ref mut writer) = logger.file_writer {
                let _ = writer.flush();
            }
        }
    }
}

/// Write message to log file (stripped of color codes)
pub fn write_to_file(message: &str) {
    if !ENABLE_FILE_LOGGING {
        return;
    }

    match FILE_LOGGER.try_lock() {
        Ok(mut logger_guard) => {
            if let Some(ref mut logger) = logger_guard.as_mut() {
                let clean_message = strip_ansi_codes(message);
                if logger.write_to_file(&clean_message).is_err() {
                    static ERROR_COUNTER: std::sync::atomic::AtomicU64 =
                        std::sync::atomic::AtomicU64::new(0);
                    let count = ERROR_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    if count % 1000 == 0 {
                        eprintln!(
                            "File logging errors (shown every 1000): count = {}",
                            count + 1
                        );
                    }
                }
            }
        }
        Err(_) => {
            static DROP_COUNTER: std::sync::atomic::AtomicU64 =
                std::sync::atomic::AtomicU64::new(0);
            let count = DROP_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if count % 1000 == 0 && count > 0 {
                eprintln!("Dropped {} log messages due to busy file logger", count + 1);
            }
        }
    }
}

/// Remove ANSI color codes from text
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;

    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}
