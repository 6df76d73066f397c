//! Age-based eviction with summarize-before-delete.
//!
//! A sweep walks `Scan -> Summarize -> PersistSummary -> Delete -> Done`.
//! The summary is stored and exactly the ids captured during `Scan` are
//! removed in one store transaction, so either both happen or neither does.

use crate::clock::Clock;
use crate::error::MemoryError;
use crate::long_term::{LongTermStore, RecordFilter};
use crate::model::MemoryRecord;
use crate::policy::RetentionPolicy;
use crate::summarizer::{SummaryEntry, Summarizer};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phases of one retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPhase {
    Scan,
    Summarize,
    PersistSummary,
    Delete,
    Done,
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionReport {
    /// Records strictly older than this were candidates.
    pub cutoff: DateTime<Utc>,
    /// Ids selected during the scan, oldest first.
    pub candidates: Vec<i64>,
    /// Id of the permanent summary record, if one was written.
    pub summary_id: Option<i64>,
    /// Number of records actually removed.
    pub deleted: usize,
}

/// Runs retention sweeps against one long-term store.
///
/// Sweeps are single-flight per engine: a sweep started while another is
/// running fails with `MemoryError::RetentionInProgress`.
pub struct RetentionEngine {
    store: Arc<dyn LongTermStore>,
    summarizer: Arc<dyn Summarizer>,
    clock: Arc<dyn Clock>,
    policy: RetentionPolicy,
    running: AtomicBool,
}

/// Clears the running flag when a sweep ends, however it ends.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RetentionEngine {
    /// Engine that ages records by the store's own clock.
    pub fn new(store: Arc<dyn LongTermStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        let clock = store.clock();
        Self {
            store,
            summarizer,
            clock,
            policy: RetentionPolicy::default(),
            running: AtomicBool::new(false),
        }
    }

    /// Replace the clock used to compute the age cutoff.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: RetentionPolicy) -> Result<Self, MemoryError> {
        if policy.summary_category.trim().is_empty() {
            return Err(MemoryError::InvalidInput(
                "summary category must not be empty".to_string(),
            ));
        }
        self.policy = policy;
        Ok(self)
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Sweep using the policy's `max_age_days`.
    pub async fn run_default(&self) -> Result<RetentionReport, MemoryError> {
        self.run_retention(self.policy.max_age_days).await
    }

    /// Summarize, then evict, every non-permanent record older than `max_age_days`.
    pub async fn run_retention(&self, max_age_days: u32) -> Result<RetentionReport, MemoryError> {
        let cutoff = TimeDelta::try_days(i64::from(max_age_days))
            .and_then(|age| self.clock.now().checked_sub_signed(age))
            .ok_or_else(|| {
                MemoryError::InvalidInput(format!(
                    "max age of {max_age_days} days is out of range"
                ))
            })?;
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("retention sweep rejected: another sweep is running");
            return Err(MemoryError::RetentionInProgress);
        }
        let _guard = SweepGuard(&self.running);

        info!("retention sweep started (phase={:?}, cutoff={cutoff})", RetentionPhase::Scan);
        let mut candidates = self
            .store
            .select(&RecordFilter::older_than(cutoff).with_permanent(false), None)
            .await?;
        candidates.reverse();
        let ids: Vec<i64> = candidates.iter().map(|record| record.id).collect();

        if candidates.is_empty() {
            info!("retention sweep finished (phase={:?}, candidates=0)", RetentionPhase::Done);
            return Ok(RetentionReport {
                cutoff,
                candidates: ids,
                summary_id: None,
                deleted: 0,
            });
        }

        debug!(
            "retention sweep summarizing (phase={:?}, candidates={})",
            RetentionPhase::Summarize,
            ids.len()
        );
        let summary = self.summarize(&candidates).await?;

        debug!(
            "retention sweep persisting summary and deleting (phase={:?}, next={:?}, category={}, candidates={})",
            RetentionPhase::PersistSummary,
            RetentionPhase::Delete,
            self.policy.summary_category,
            ids.len()
        );
        let (summary_id, deleted) = self
            .store
            .replace_with_summary(&self.policy.summary_category, &summary, &ids)
            .await
            .inspect_err(|err| {
                warn!("retention sweep aborted: summary and deletions rolled back ({err})");
            })?;
        if deleted != ids.len() {
            warn!(
                "retention sweep deleted fewer records than scanned (scanned={}, deleted={deleted})",
                ids.len()
            );
        }
        info!(
            "retention sweep finished (phase={:?}, summary_id={summary_id}, deleted={deleted})",
            RetentionPhase::Done
        );
        Ok(RetentionReport {
            cutoff,
            candidates: ids,
            summary_id: Some(summary_id),
            deleted,
        })
    }

    async fn summarize(&self, candidates: &[MemoryRecord]) -> Result<String, MemoryError> {
        let entries: Vec<SummaryEntry> = candidates
            .iter()
            .map(|record| SummaryEntry {
                category: record.category.clone(),
                content: record.content.clone(),
            })
            .collect();
        let summary = self.summarizer.summarize(&entries).await.map_err(|err| {
            warn!("retention sweep aborted before delete: summarizer failed ({err})");
            MemoryError::SummarizationFailed(err.to_string())
        })?;
        if summary.trim().is_empty() {
            warn!("retention sweep aborted before delete: summarizer returned nothing");
            return Err(MemoryError::SummarizationFailed(
                "summarizer returned an empty summary".to_string(),
            ));
        }
        Ok(summary)
    }
}
