//! Tags identifying which engine component produced a log line.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    Tailer,
    Parser,
    Exchange,
    Delta,
    Segmenter,
    Player,
    Collector,
    Valuation,
    Cloud,
    Store,
    Http,
    System,
    Other(String),
}

impl LogTag {
    /// Key used to match `--debug-<module>` / `--verbose-<module>` flags.
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Tailer => "tailer".to_string(),
            LogTag::Parser => "parser".to_string(),
            LogTag::Exchange => "exchange".to_string(),
            LogTag::Delta => "delta".to_string(),
            LogTag::Segmenter => "segmenter".to_string(),
            LogTag::Player => "player".to_string(),
            LogTag::Collector => "collector".to_string(),
            LogTag::Valuation => "valuation".to_string(),
            LogTag::Cloud => "cloud".to_string(),
            LogTag::Store => "store".to_string(),
            LogTag::Http => "http".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Plain uppercase label used in the file log (no ANSI codes).
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Tailer => "TAILER".to_string(),
            LogTag::Parser => "PARSER".to_string(),
            LogTag::Exchange => "EXCHANGE".to_string(),
            LogTag::Delta => "DELTA".to_string(),
            LogTag::Segmenter => "SEGMENTER".to_string(),
            LogTag::Player => "PLAYER".to_string(),
            LogTag::Collector => "COLLECTOR".to_string(),
            LogTag::Valuation => "VALUATION".to_string(),
            LogTag::Cloud => "CLOUD".to_string(),
            LogTag::Store => "STORE".to_string(),
            LogTag::Http => "HTTP".to_string(),
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
