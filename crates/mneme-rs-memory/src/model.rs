//! Record models shared by the stores and engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category reserved for records written by retention sweeps.
pub const SUMMARY_CATEGORY: &str = "summarized_deletions";

/// Persisted long-term memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryRecord {
    /// Surrogate key assigned by the store, strictly increasing.
    pub id: i64,
    /// Creation time. Never updated after insert.
    pub timestamp: DateTime<Utc>,
    /// Free-text grouping label.
    pub category: String,
    /// Record content.
    pub content: String,
    /// Exempt from retention eviction once set.
    pub permanent: bool,
}

/// One exchange between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Message the user sent.
    pub user_message: String,
    /// Response the assistant produced, possibly truncated.
    pub ai_response: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// A distinct category together with its most recent record timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStat {
    pub category: String,
    pub latest: DateTime<Utc>,
}

/// A record paired with the similarity score that selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord<T> {
    pub record: T,
    /// Similarity on a 0-100 scale.
    pub score: f64,
}
