//! Summarizer capability consumed by retention sweeps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single record handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub category: String,
    pub content: String,
}

/// Error raised by a summarizer implementation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SummarizerError {
    pub message: String,
}

impl SummarizerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
/// Turns a batch of evicted entries into one summary text.
///
/// Implementations must not touch the store they summarize for.
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, entries: &[SummaryEntry]) -> Result<String, SummarizerError>;
}
