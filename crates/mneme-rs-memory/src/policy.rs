//! Truncation, retrieval and retention policies.

use crate::error::MemoryError;
use crate::model::SUMMARY_CATEGORY;

/// Default marker appended to truncated content.
pub const DEFAULT_TRUNCATION_MARKER: &str = "... (truncated)";

/// Cap-then-mark truncation applied by the store to every insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationPolicy {
    /// Optional maximum content length in characters.
    pub max_chars: Option<usize>,
    /// Suffix appended after the cut.
    pub marker: String,
}

impl TruncationPolicy {
    /// Policy that stores content untouched.
    pub fn disabled() -> Self {
        Self {
            max_chars: None,
            marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }

    /// Apply the policy, returning the content to persist.
    pub fn apply(&self, content: &str) -> String {
        let Some(max_chars) = self.max_chars else {
            return content.to_string();
        };
        if content.chars().count() <= max_chars {
            return content.to_string();
        }
        let mut truncated: String = content.chars().take(max_chars).collect();
        truncated.push_str(&self.marker);
        truncated
    }
}

impl Default for TruncationPolicy {
    /// Cap at 500 characters.
    fn default() -> Self {
        Self {
            max_chars: Some(500),
            marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }
}

/// Confidence gates and limits for fuzzy retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalPolicy {
    /// Minimum category score (exclusive) for category retrieval.
    pub category_threshold: f64,
    /// Minimum content score (exclusive) for content search.
    pub content_threshold: f64,
    /// Only scan this many most recent records during content search.
    pub search_window: Option<usize>,
}

impl RetrievalPolicy {
    /// Reject thresholds outside the 0-100 score scale.
    pub fn validate(&self) -> Result<(), MemoryError> {
        validate_threshold(self.category_threshold)?;
        validate_threshold(self.content_threshold)?;
        if self.search_window == Some(0) {
            return Err(MemoryError::InvalidInput(
                "search window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            category_threshold: 60.0,
            content_threshold: 70.0,
            search_window: None,
        }
    }
}

/// Settings for retention sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Age in days past which non-permanent records are evicted.
    pub max_age_days: u32,
    /// Category of the permanent summary record written by each sweep.
    pub summary_category: String,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            summary_category: SUMMARY_CATEGORY.to_string(),
        }
    }
}

/// Ensure a similarity threshold lies on the 0-100 scale.
pub(crate) fn validate_threshold(threshold: f64) -> Result<(), MemoryError> {
    if threshold.is_nan() || !(0.0..=100.0).contains(&threshold) {
        return Err(MemoryError::InvalidInput(format!(
            "threshold must be within 0..=100 (got {threshold})"
        )));
    }
    Ok(())
}

/// Ensure a result limit is usable.
pub(crate) fn validate_limit(limit: usize) -> Result<(), MemoryError> {
    if limit == 0 {
        return Err(MemoryError::InvalidInput(
            "limit must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
