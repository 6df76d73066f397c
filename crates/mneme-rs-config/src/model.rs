//! Configuration schema for mneme.

use mneme_rs_memory::{
    DEFAULT_TRUNCATION_MARKER, RetentionPolicy, RetrievalPolicy, SUMMARY_CATEGORY,
    TruncationPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root config for a mneme store.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MnemeConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub truncation: TruncationConfig,
    #[serde(default)]
    pub conversations: ConversationsConfig,
}

/// Where the two stores live on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding both stores; relative paths resolve against the cwd.
    #[serde(default = "default_storage_root")]
    pub root: String,
    #[serde(default = "default_long_term_file")]
    pub long_term_file: String,
    #[serde(default = "default_short_term_file")]
    pub short_term_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            long_term_file: default_long_term_file(),
            short_term_file: default_short_term_file(),
        }
    }
}

impl StorageConfig {
    /// Storage root, joined onto `base` when relative.
    pub fn root_dir(&self, base: &Path) -> PathBuf {
        let root = Path::new(&self.root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            base.join(root)
        }
    }

    /// Path of the long-term SQLite database.
    pub fn long_term_path(&self, base: &Path) -> PathBuf {
        self.root_dir(base).join(&self.long_term_file)
    }

    /// Path of the short-term JSON document.
    pub fn short_term_path(&self, base: &Path) -> PathBuf {
        self.root_dir(base).join(&self.short_term_file)
    }
}

fn default_storage_root() -> String {
    ".mneme".to_string()
}

fn default_long_term_file() -> String {
    "long_term_memory.db".to_string()
}

fn default_short_term_file() -> String {
    "short_term_memory.json".to_string()
}

/// Fuzzy retrieval thresholds and limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default = "default_category_threshold")]
    pub category_threshold: f64,
    #[serde(default = "default_content_threshold")]
    pub content_threshold: f64,
    /// Result limit used when a caller does not pass one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Scan only the most recent records during content search; null scans all.
    #[serde(default)]
    pub search_window: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            category_threshold: default_category_threshold(),
            content_threshold: default_content_threshold(),
            default_limit: default_limit(),
            search_window: None,
        }
    }
}

impl From<&RetrievalConfig> for RetrievalPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            category_threshold: config.category_threshold,
            content_threshold: config.content_threshold,
            search_window: config.search_window,
        }
    }
}

fn default_category_threshold() -> f64 {
    60.0
}

fn default_content_threshold() -> f64 {
    70.0
}

fn default_limit() -> usize {
    5
}

/// Age-based eviction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    #[serde(default = "default_summary_category")]
    pub summary_category: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            summary_category: default_summary_category(),
        }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            max_age_days: config.max_age_days,
            summary_category: config.summary_category.clone(),
        }
    }
}

fn default_max_age_days() -> u32 {
    30
}

fn default_summary_category() -> String {
    SUMMARY_CATEGORY.to_string()
}

/// Content cap applied on insert. `max_chars: null` stores content untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TruncationConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: Option<usize>,
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            marker: default_marker(),
        }
    }
}

impl From<&TruncationConfig> for TruncationPolicy {
    fn from(config: &TruncationConfig) -> Self {
        Self {
            max_chars: config.max_chars,
            marker: config.marker.clone(),
        }
    }
}

fn default_max_chars() -> Option<usize> {
    Some(500)
}

fn default_marker() -> String {
    DEFAULT_TRUNCATION_MARKER.to_string()
}

/// Conversation log housekeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationsConfig {
    /// Conversations kept by a prune.
    #[serde(default = "default_keep_latest")]
    pub keep_latest: usize,
    /// Conversations listed when no limit is given.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for ConversationsConfig {
    fn default() -> Self {
        Self {
            keep_latest: default_keep_latest(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_keep_latest() -> usize {
    100
}

fn default_recent_limit() -> usize {
    10
}
