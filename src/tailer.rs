//! Log Tailer (B): incremental, restartable line reader over the rotating
//! game log file (§4.1). Knows nothing about the line grammar; it only
//! produces complete, decoded text lines in file order and persists its
//! own read position through the Store.

use crate::database::Store;
use crate::errors::{EngineError, EngineResult};
use crate::logger::{self, LogTag};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

/// Default cap on how many already-decoded lines `poll` hands back in one
/// call (spec.md §4.1 "yields after a bounded number of lines per tick to
/// allow cancellation"). The Collector drives `poll_bounded` directly with
/// its own chunk size for the cancellable ingest loop; this default backs
/// the plain `poll` convenience wrapper used by callers (and tests) that
/// don't care about chunking.
pub const DEFAULT_MAX_LINES_PER_POLL: usize = 500;

const UTF16_BOM_LE: [u8; 2] = [0xFF, 0xFE];
const UTF16_BOM_BE: [u8; 2] = [0xFE, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

fn newline_bytes(encoding: Encoding) -> &'static [u8] {
    match encoding {
        Encoding::Utf8 => &[0x0A],
        Encoding::Utf16Le => &[0x0A, 0x00],
        Encoding::Utf16Be => &[0x00, 0x0A],
    }
}

fn decode_bytes(raw: &[u8], encoding: Encoding) -> String {
    let decoded = match encoding {
        Encoding::Utf8 => String::from_utf8_lossy(raw).into_owned(),
        Encoding::Utf16Le => {
            let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            String::from_utf16_lossy(&units)
        }
        Encoding::Utf16Be => {
            let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
            String::from_utf16_lossy(&units)
        }
    };
    decoded.trim_end_matches('\r').to_string()
}

/// Detect UTF-16 by BOM, or by the interleaved-null-byte pattern a BOM-less
/// UTF-16LE stream of mostly-ASCII text produces. Only meaningful on the
/// first bytes of a stream.
fn detect_encoding(buf: &[u8]) -> Encoding {
    if buf.starts_with(&UTF16_BOM_LE) {
        return Encoding::Utf16Le;
    }
    if buf.starts_with(&UTF16_BOM_BE) {
        return Encoding::Utf16Be;
    }
    if buf.len() >= 8 {
        let sample = &buf[..buf.len().min(64)];
        let odd_positions = sample.len() / 2;
        let nulls_at_odd = sample.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
        if odd_positions > 0 && nulls_at_odd as f64 / odd_positions as f64 > 0.6 {
            return Encoding::Utf16Le;
        }
    }
    Encoding::Utf8
}

fn strip_bom(buf: &[u8], encoding: Encoding) -> usize {
    match encoding {
        Encoding::Utf16Le if buf.starts_with(&UTF16_BOM_LE) => 2,
        Encoding::Utf16Be if buf.starts_with(&UTF16_BOM_BE) => 2,
        _ => 0,
    }
}

/// Split raw bytes on the encoding's newline marker. Returns complete
/// decoded lines — each tagged with the raw byte length it consumes,
/// including its newline marker, so the caller can advance a persisted
/// offset exactly as far as the lines it has actually handed out — plus
/// the undecoded remainder to carry into the next read.
fn split_lines(raw: &[u8], encoding: Encoding) -> (Vec<(String, u64)>, Vec<u8>) {
    let nl = newline_bytes(encoding);
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + nl.len() <= raw.len() {
        if &raw[i..i + nl.len()] == nl {
            let consumed = (i + nl.len() - start) as u64;
            lines.push((decode_bytes(&raw[start..i], encoding), consumed));
            i += nl.len();
            start = i;
        } else {
            i += 1;
        }
    }
    (lines, raw[start..].to_vec())
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{}:{}", metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn file_identity(metadata: &std::fs::Metadata) -> String {
    metadata
        .created()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Outcome of one poll: zero or more complete lines, plus whether the
/// source was reachable at all (feeds the `status` HTTP resource).
pub struct TailerTick {
    pub lines: Vec<String>,
    pub source_available: bool,
}

pub struct Tailer {
    path: PathBuf,
    log_path_key: String,
    file_id: Option<String>,
    /// Persisted, safe-to-resume-from byte offset. Advances only for lines
    /// actually handed out by `poll_bounded`, never merely read into the
    /// internal buffer — it must never race ahead of what the Collector
    /// has actually applied to the Store.
    offset: u64,
    /// File position of the next unread byte; always >= `offset`. Reset
    /// alongside `offset` on rotation, but never itself persisted.
    read_pos: u64,
    /// Raw bytes read past `read_pos` that don't yet form a complete line.
    partial: Vec<u8>,
    /// Complete, decoded lines already split out of `partial` but not yet
    /// returned to the caller because of the per-poll line cap.
    pending: VecDeque<(String, u64)>,
    encoding: Encoding,
}

impl Tailer {
    /// Construct a tailer, resuming from the persisted (fileId, byteOffset)
    /// if one was recorded for this path.
    pub fn new(path: PathBuf, store: &Store) -> EngineResult<Self> {
        let log_path_key = path.to_string_lossy().to_string();
        let persisted = store.get_tailer_offset(&log_path_key)?;
        let (file_id, offset) = match persisted {
            Some(o) => (Some(o.file_id), o.byte_offset),
            None => (None, 0),
        };
        Ok(Self {
            path,
            log_path_key,
            file_id,
            offset,
            read_pos: offset,
            partial: Vec::new(),
            pending: VecDeque::new(),
            encoding: Encoding::Utf8,
        })
    }

    pub fn log_path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn persist_offset(&self, store: &Store) -> EngineResult<()> {
        if let Some(id) = &self.file_id {
            store.save_tailer_offset(&self.log_path_key, id, self.offset)?;
        }
        Ok(())
    }

    /// Bounded backward scan of the file's tail, used once at startup to
    /// pre-seed the Player Context before live tailing begins (§4.6). Does
    /// not touch the persisted offset or the live read cursor.
    pub fn cold_start_scan(&self, max_bytes: u64) -> EngineResult<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };
        let len = file.metadata().map_err(EngineError::Io)?.len();
        let start = len.saturating_sub(max_bytes);
        file.seek(SeekFrom::Start(start)).map_err(EngineError::Io)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(EngineError::Io)?;
        let encoding = detect_encoding(&buf);
        let bom_len = strip_bom(&buf, encoding);
        let (lines, _) = split_lines(&buf[bom_len..], encoding);
        Ok(lines.into_iter().map(|(line, _)| line).collect())
    }

    /// One poll cycle bounded to at most `max_lines` returned lines:
    /// detect rotation, read any new bytes once the already-decoded
    /// backlog (`pending`) runs low, then hand out up to `max_lines` of
    /// it. Extra decoded lines stay buffered in `pending` for the next
    /// call instead of triggering another file read, so a large backlog
    /// drains over several bounded calls rather than one unbounded pass
    /// (§4.1 "yields after a bounded number of lines per tick"). Never
    /// returns an error for a missing file; permission errors are
    /// surfaced so the caller can log them without tearing down the
    /// pipeline.
    pub fn poll_bounded(&mut self, max_lines: usize) -> EngineResult<TailerTick> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TailerTick {
                    lines: Vec::new(),
                    source_available: false,
                });
            }
            Err(e) => return Err(EngineError::SourceUnavailable(e.to_string())),
        };

        let metadata = file.metadata().map_err(EngineError::Io)?;
        let current_id = file_identity(&metadata);
        let current_len = metadata.len();

        let rotated = self.file_id.as_deref() != Some(current_id.as_str()) || current_len < self.offset;
        if rotated {
            if self.file_id.is_some() {
                logger::info(LogTag::Tailer, "log rotation or truncation detected, resuming from offset 0");
            }
            self.file_id = Some(current_id);
            self.offset = 0;
            self.read_pos = 0;
            self.partial.clear();
            self.pending.clear();
            self.encoding = Encoding::Utf8;
        }

        if self.pending.len() < max_lines {
            let mut file = file;
            file.seek(SeekFrom::Start(self.read_pos)).map_err(EngineError::Io)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(EngineError::Io)?;
            if !buf.is_empty() {
                let at_stream_start = self.read_pos == 0 && self.partial.is_empty() && self.pending.is_empty();
                self.read_pos += buf.len() as u64;

                let mut bom_skip = 0;
                if at_stream_start {
                    self.encoding = detect_encoding(&buf);
                    bom_skip = strip_bom(&buf, self.encoding);
                }

                self.partial.extend_from_slice(&buf[bom_skip..]);
                let (lines, remainder) = split_lines(&self.partial, self.encoding);
                self.partial = remainder;
                self.pending.extend(lines);
            }
        }

        let mut lines = Vec::with_capacity(max_lines.min(self.pending.len()));
        for _ in 0..max_lines {
            let Some((line, consumed)) = self.pending.pop_front() else {
                break;
            };
            self.offset += consumed;
            lines.push(line);
        }

        Ok(TailerTick {
            lines,
            source_available: true,
        })
    }

    /// Convenience wrapper over `poll_bounded` for callers that don't need
    /// to control the per-call chunk size.
    pub fn poll(&mut self) -> EngineResult<TailerTick> {
        self.poll_bounded(DEFAULT_MAX_LINES_PER_POLL)
    }
}
