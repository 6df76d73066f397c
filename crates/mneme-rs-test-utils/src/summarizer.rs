use async_trait::async_trait;
use mneme_rs_memory::{SummaryEntry, Summarizer, SummarizerError};
use parking_lot::Mutex;

/// Always returns the same summary text.
#[derive(Debug, Clone)]
pub struct FixedSummarizer {
    summary: String,
}

impl FixedSummarizer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
        Ok(self.summary.clone())
    }
}

/// Always fails, simulating an unavailable text generator.
#[derive(Debug, Clone, Default)]
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
        Err(SummarizerError::new("summarizer unavailable"))
    }
}

/// Joins `category:content` pairs and records every batch it was given.
#[derive(Debug, Default)]
pub struct RecordingSummarizer {
    calls: Mutex<Vec<Vec<SummaryEntry>>>,
}

impl RecordingSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Vec<SummaryEntry>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    async fn summarize(&self, entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
        self.calls.lock().push(entries.to_vec());
        let joined = entries
            .iter()
            .map(|entry| format!("{}:{}", entry.category, entry.content))
            .collect::<Vec<_>>()
            .join(";");
        Ok(format!("summary:{joined}"))
    }
}
