//! Fuzzy retrieval over long-term memory.

use crate::error::MemoryError;
use crate::fuzzy::{partial_ratio_ignore_case, ratio_ignore_case};
use crate::long_term::{LongTermStore, RecordFilter};
use crate::model::{MemoryRecord, ScoredRecord};
use crate::policy::{RetrievalPolicy, validate_limit, validate_threshold};
use log::debug;
use std::cmp::Ordering;
use std::sync::Arc;

/// Best category for a query and its similarity score (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMatch {
    pub category: String,
    pub score: f64,
}

/// Answers "what do we know about X" against a long-term store.
#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn LongTermStore>,
    policy: RetrievalPolicy,
}

impl RetrievalEngine {
    /// Engine with default thresholds (category 60, content 70).
    pub fn new(store: Arc<dyn LongTermStore>) -> Self {
        Self {
            store,
            policy: RetrievalPolicy::default(),
        }
    }

    /// Engine with explicit thresholds.
    pub fn with_policy(
        store: Arc<dyn LongTermStore>,
        policy: RetrievalPolicy,
    ) -> Result<Self, MemoryError> {
        policy.validate()?;
        Ok(Self { store, policy })
    }

    pub fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    /// Highest scoring category for `query`, `None` when the store is empty.
    ///
    /// Equal scores go to the category with the most recent record.
    pub async fn best_category_match(
        &self,
        query: &str,
    ) -> Result<Option<CategoryMatch>, MemoryError> {
        let categories = self.store.categories().await?;
        let mut best: Option<CategoryMatch> = None;
        for stat in categories {
            let score = ratio_ignore_case(query, &stat.category);
            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(CategoryMatch {
                    category: stat.category,
                    score,
                });
            }
        }
        if let Some(found) = &best {
            debug!(
                "fuzzy category match (query={query}, category={}, score={:.1})",
                found.category, found.score
            );
        }
        Ok(best)
    }

    /// Most recent records of the best matching category, using the configured threshold.
    pub async fn retrieve_by_category(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.retrieve_by_category_with_threshold(query, limit, self.policy.category_threshold)
            .await
    }

    /// Most recent records of the best matching category if its score exceeds `threshold`.
    pub async fn retrieve_by_category_with_threshold(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        validate_limit(limit)?;
        validate_threshold(threshold)?;
        let Some(found) = self.best_category_match(query).await? else {
            return Ok(Vec::new());
        };
        if found.score <= threshold {
            debug!(
                "category match below threshold (category={}, score={:.1}, threshold={threshold})",
                found.category, found.score
            );
            return Ok(Vec::new());
        }
        self.store.query_by_category(&found.category, limit).await
    }

    /// Records whose content partially matches `query`, using the configured threshold.
    pub async fn search_content(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.search_content_with_threshold(query, limit, self.policy.content_threshold)
            .await
    }

    /// Records whose content scores above `threshold`, best first.
    pub async fn search_content_with_threshold(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let hits = self.search_content_scored(query, limit, threshold).await?;
        Ok(hits.into_iter().map(|hit| hit.record).collect())
    }

    /// Scored content search. Linear in the number of scanned records.
    ///
    /// Ordered by score descending, then timestamp descending.
    pub async fn search_content_scored(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredRecord<MemoryRecord>>, MemoryError> {
        validate_limit(limit)?;
        validate_threshold(threshold)?;
        let records = self
            .store
            .select(&RecordFilter::all(), self.policy.search_window)
            .await?;
        let scanned = records.len();
        let mut hits: Vec<_> = records
            .into_iter()
            .filter_map(|record| {
                let score = partial_ratio_ignore_case(query, &record.content);
                (score > threshold).then_some(ScoredRecord { record, score })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.record.timestamp.cmp(&a.record.timestamp))
                .then_with(|| b.record.id.cmp(&a.record.id))
        });
        hits.truncate(limit);
        debug!(
            "content search (query={query}, scanned={scanned}, returned={})",
            hits.len()
        );
        Ok(hits)
    }
}
