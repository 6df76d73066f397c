//! Summarizer that needs no text generator.

use async_trait::async_trait;
use mneme_rs_memory::{SummaryEntry, Summarizer, SummarizerError};

/// Header line of every concatenated summary.
const SUMMARY_HEADER: &str = "Summary of deleted memories:";

/// Lists each evicted entry as `category: content` under a fixed header.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatSummarizer;

#[async_trait]
impl Summarizer for ConcatSummarizer {
    async fn summarize(&self, entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
        if entries.is_empty() {
            return Err(SummarizerError::new("no entries to summarize"));
        }
        let mut summary = String::from(SUMMARY_HEADER);
        for entry in entries {
            summary.push('\n');
            summary.push_str(&entry.category);
            summary.push_str(": ");
            summary.push_str(&entry.content);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::ConcatSummarizer;
    use mneme_rs_memory::{SummaryEntry, Summarizer};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn lists_entries_in_order() {
        let entries = vec![
            SummaryEntry {
                category: "work".to_string(),
                content: "finish report".to_string(),
            },
            SummaryEntry {
                category: "home".to_string(),
                content: "fix sink".to_string(),
            },
        ];
        let summary = ConcatSummarizer.summarize(&entries).await.expect("summary");
        assert_eq!(
            summary,
            "Summary of deleted memories:\nwork: finish report\nhome: fix sink"
        );
    }

    #[tokio::test]
    async fn empty_batch_is_an_error() {
        assert!(ConcatSummarizer.summarize(&[]).await.is_err());
    }
}
