//! Error types for memory operations.

/// Errors returned by memory stores and engines.
///
/// "Nothing matched" is never an error: lookups that find nothing return an
/// empty sequence, `None` or `false` instead.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The backing medium is unreachable or corrupt.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Reading or writing the short-term document failed.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Caller supplied an argument the store refuses to act on.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The injected summarizer failed or is unavailable.
    #[error("summarization failed: {0}")]
    SummarizationFailed(String),
    /// Another retention sweep is already running on this engine.
    #[error("retention sweep already in progress")]
    RetentionInProgress,
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        MemoryError::StorageUnavailable(err.to_string())
    }
}
