//! Engine-wide error taxonomy.
//!
//! Realizes the categories from the error handling design: source
//! unavailability, store and cloud failures each split into a transient
//! (retryable) and fatal half, plus state inconsistencies the delta engine
//! chooses to absorb rather than propagate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("log source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("state inconsistent: {0}")]
    StateInconsistent(String),

    #[error("store error (transient): {0}")]
    StoreTransient(#[source] rusqlite::Error),

    #[error("store error (fatal): {0}")]
    StoreFatal(String),

    #[error("cloud error (retryable): {0}")]
    CloudRetryable(String),

    #[error("cloud error (fatal): {0}")]
    CloudFatal(String),

    #[error("scope change race: {0}")]
    ScopeChangeRace(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("toml error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl EngineError {
    /// Whether the caller should keep the pipeline alive and retry later,
    /// as opposed to surfacing the failure as permanent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::SourceUnavailable(_)
                | EngineError::StoreTransient(_)
                | EngineError::CloudRetryable(_)
        )
    }

    /// True for the outbox/downlink half of the taxonomy that participates
    /// in the cloud worker's exponential backoff.
    pub fn is_cloud_retryable(&self) -> bool {
        matches!(self, EngineError::CloudRetryable(_))
    }

    /// Suggested backoff, base 2^attempts capped at one hour, per the
    /// uplink retry contract.
    pub fn retry_after_seconds(&self, attempts: u32) -> Option<u64> {
        if !self.is_recoverable() {
            return None;
        }
        let capped = attempts.min(12); // 2^12s ~= 68 min, already past the cap
        Some((2u64.saturating_pow(capped)).min(3600))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
