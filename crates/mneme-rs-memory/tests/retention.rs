//! Retention sweep behaviour against a file-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use mneme_rs_memory::{
    CategoryStat, Clock, LongTermStore, MemoryError, MemoryRecord, RecordFilter, RetentionEngine,
    SUMMARY_CATEGORY, SqliteLongTermStore, SummaryEntry, Summarizer, SummarizerError,
};
use mneme_rs_test_utils::{
    FailingSummarizer, FixedSummarizer, ManualClock, RecordingSummarizer, temp_stores,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Notify;

async fn all_records(store: &dyn LongTermStore) -> Vec<MemoryRecord> {
    store.select(&RecordFilter::all(), None).await.expect("select")
}

fn ids(records: &[MemoryRecord]) -> BTreeSet<i64> {
    records.iter().map(|record| record.id).collect()
}

/// Two aged work items become one permanent summary record.
#[tokio::test]
async fn sweep_replaces_candidates_with_one_summary() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();

    let first = store.insert("work", "finish report", false).await.expect("a");
    clock.advance(Duration::seconds(1));
    let second = store.insert("work", "call client", false).await.expect("b");
    clock.advance(Duration::seconds(1));

    let engine = RetentionEngine::new(
        store.clone(),
        Arc::new(FixedSummarizer::new("summary:finish report;call client")),
    )
    .with_clock(clock.clone());
    let report = engine.run_retention(0).await.expect("sweep");

    assert_eq!(report.candidates, vec![first, second]);
    assert_eq!(report.deleted, 2);

    let remaining = all_records(store.as_ref()).await;
    assert_eq!(remaining.len(), 1);
    let summary = &remaining[0];
    assert_eq!(Some(summary.id), report.summary_id);
    assert_eq!(summary.category, SUMMARY_CATEGORY);
    assert_eq!(summary.content, "summary:finish report;call client");
    assert!(summary.permanent);
}

/// The summarizer sees every candidate, oldest first.
#[tokio::test]
async fn summarizer_receives_candidates_in_order() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();

    store.insert("work", "finish report", false).await.expect("a");
    clock.advance(Duration::hours(1));
    store.insert("home", "fix sink", false).await.expect("b");
    clock.advance(Duration::days(10));
    store.insert("home", "recent", false).await.expect("c");

    let summarizer = Arc::new(RecordingSummarizer::new());
    let engine = RetentionEngine::new(store.clone(), summarizer.clone()).with_clock(clock.clone());
    let report = engine.run_retention(5).await.expect("sweep");

    assert_eq!(
        summarizer.calls(),
        vec![vec![
            SummaryEntry {
                category: "work".to_string(),
                content: "finish report".to_string(),
            },
            SummaryEntry {
                category: "home".to_string(),
                content: "fix sink".to_string(),
            },
        ]]
    );
    assert_eq!(report.deleted, 2);
    let contents: Vec<_> = all_records(store.as_ref())
        .await
        .into_iter()
        .map(|record| record.content)
        .collect();
    assert_eq!(
        contents,
        vec!["summary:work:finish report;home:fix sink".to_string(), "recent".to_string()]
    );
}

/// A failing summarizer leaves the candidate set untouched.
#[tokio::test]
async fn failed_summary_deletes_nothing() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    store.insert("work", "a", false).await.expect("a");
    store.insert("home", "b", false).await.expect("b");
    clock.advance(Duration::days(60));

    let before = all_records(store.as_ref()).await;
    let engine =
        RetentionEngine::new(store.clone(), Arc::new(FailingSummarizer)).with_clock(clock.clone());
    let err = engine.run_retention(30).await.unwrap_err();
    assert!(matches!(err, MemoryError::SummarizationFailed(_)));

    let after = all_records(store.as_ref()).await;
    assert_eq!(before, after);
}

/// Permanent records survive any sweep, however old.
#[tokio::test]
async fn permanent_records_are_never_evicted() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    let pinned = store.insert("identity", "my name is Sam", true).await.expect("pinned");
    store.insert("work", "stale", false).await.expect("stale");
    store.insert("work", "marked later", false).await.expect("later");
    assert!(store.mark_permanent("marked later").await.expect("mark"));
    clock.advance(Duration::days(3650));

    let engine = RetentionEngine::new(store.clone(), Arc::new(RecordingSummarizer::new()))
        .with_clock(clock.clone());
    engine.run_retention(1).await.expect("first sweep");
    clock.advance(Duration::days(3650));
    engine.run_retention(1).await.expect("second sweep");

    let remaining = all_records(store.as_ref()).await;
    assert!(remaining.iter().any(|record| record.id == pinned));
    assert!(remaining.iter().any(|record| record.content == "marked later"));
    assert!(!remaining.iter().any(|record| record.content == "stale"));
    assert!(remaining.iter().all(|record| record.permanent));
}

/// Records written while the summarizer runs are not part of the sweep.
#[tokio::test]
async fn sweep_deletes_only_the_scanned_set() {
    struct InterleavingSummarizer {
        store: Arc<SqliteLongTermStore>,
        clock: Arc<ManualClock>,
        backdate_to: DateTime<Utc>,
    }

    #[async_trait]
    impl Summarizer for InterleavingSummarizer {
        async fn summarize(&self, _entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
            let resume = self.clock.now();
            self.clock.set(self.backdate_to);
            self.store
                .insert("work", "written mid-sweep", false)
                .await
                .map_err(|err| SummarizerError::new(err.to_string()))?;
            self.clock.set(resume);
            Ok("summary".to_string())
        }
    }

    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    let start = clock.now();
    let old = store.insert("work", "old", false).await.expect("old");
    clock.advance(Duration::days(40));

    let summarizer = Arc::new(InterleavingSummarizer {
        store: store.clone(),
        clock: clock.clone(),
        backdate_to: start,
    });
    let engine = RetentionEngine::new(store.clone(), summarizer).with_clock(clock.clone());
    let report = engine.run_retention(30).await.expect("sweep");

    assert_eq!(report.candidates, vec![old]);
    let contents: BTreeSet<_> = all_records(store.as_ref())
        .await
        .into_iter()
        .map(|record| record.content)
        .collect();
    assert_eq!(
        contents,
        BTreeSet::from(["summary".to_string(), "written mid-sweep".to_string()])
    );
}

/// Store wrapper whose summary writes always fail.
struct SummaryWriteFails {
    inner: Arc<SqliteLongTermStore>,
}

#[async_trait]
impl LongTermStore for SummaryWriteFails {
    async fn initialize(&self) -> Result<(), MemoryError> {
        self.inner.initialize().await
    }

    async fn insert(
        &self,
        category: &str,
        content: &str,
        permanent: bool,
    ) -> Result<i64, MemoryError> {
        self.inner.insert(category, content, permanent).await
    }

    async fn insert_verbatim(
        &self,
        _category: &str,
        _content: &str,
        _permanent: bool,
    ) -> Result<i64, MemoryError> {
        Err(MemoryError::StorageUnavailable("disk full".to_string()))
    }

    async fn select(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.inner.select(filter, limit).await
    }

    async fn categories(&self) -> Result<Vec<CategoryStat>, MemoryError> {
        self.inner.categories().await
    }

    async fn mark_permanent(&self, content: &str) -> Result<bool, MemoryError> {
        self.inner.mark_permanent(content).await
    }

    async fn delete_where(&self, filter: &RecordFilter) -> Result<usize, MemoryError> {
        self.inner.delete_where(filter).await
    }

    async fn replace_with_summary(
        &self,
        _category: &str,
        _summary: &str,
        _ids: &[i64],
    ) -> Result<(i64, usize), MemoryError> {
        Err(MemoryError::StorageUnavailable("disk full".to_string()))
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.inner.clock()
    }
}

/// If the summary cannot be stored, nothing is deleted.
#[tokio::test]
async fn failed_summary_write_deletes_nothing() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    store.insert("work", "a", false).await.expect("a");
    store.insert("work", "b", false).await.expect("b");
    clock.advance(Duration::days(31));
    let before = ids(&all_records(store.as_ref()).await);

    let failing = Arc::new(SummaryWriteFails {
        inner: store.clone(),
    });
    let engine = RetentionEngine::new(failing, Arc::new(RecordingSummarizer::new()))
        .with_clock(clock.clone());
    let err = engine.run_retention(30).await.unwrap_err();
    assert!(matches!(err, MemoryError::StorageUnavailable(_)));

    let after = ids(&all_records(store.as_ref()).await);
    assert_eq!(before, after);
}

/// Summarizer that parks until released, to hold a sweep open.
struct GatedSummarizer {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Summarizer for GatedSummarizer {
    async fn summarize(&self, _entries: &[SummaryEntry]) -> Result<String, SummarizerError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("gated summary".to_string())
    }
}

/// A second sweep on the same engine is refused while one is running.
#[tokio::test]
async fn concurrent_sweeps_are_single_flight() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    store.insert("work", "old", false).await.expect("old");
    clock.advance(Duration::days(2));

    let summarizer = Arc::new(GatedSummarizer {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let engine = Arc::new(
        RetentionEngine::new(store.clone(), summarizer.clone()).with_clock(clock.clone()),
    );

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_retention(1).await })
    };
    summarizer.entered.notified().await;

    let err = engine.run_retention(1).await.unwrap_err();
    assert!(matches!(err, MemoryError::RetentionInProgress));

    summarizer.release.notify_one();
    let report = first.await.expect("join").expect("first sweep");
    assert_eq!(report.deleted, 1);

    // The guard is released once the first sweep ends.
    let report = engine.run_retention(1).await.expect("later sweep");
    assert_eq!(report.summary_id, None);
}

/// Without an explicit clock the engine ages records by the store's clock.
#[tokio::test]
async fn engine_defaults_to_store_clock() {
    let start = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    let old = store.insert("work", "far future note", false).await.expect("old");
    clock.advance(Duration::days(40));

    let engine = RetentionEngine::new(store.clone(), Arc::new(FixedSummarizer::new("summary")));
    let report = engine.run_retention(30).await.expect("sweep");

    assert_eq!(report.cutoff, start + Duration::days(10));
    assert_eq!(report.candidates, vec![old]);
    assert_eq!(report.deleted, 1);
}

/// An age too large for the calendar is rejected before anything is touched.
#[tokio::test]
async fn out_of_range_age_deletes_nothing() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let store = stores.long_term.clone();
    store.insert("work", "old", false).await.expect("old");
    clock.advance(Duration::days(3650));
    let before = ids(&all_records(store.as_ref()).await);

    let summarizer = Arc::new(RecordingSummarizer::new());
    let engine = RetentionEngine::new(store.clone(), summarizer.clone());
    let err = engine.run_retention(u32::MAX).await.unwrap_err();

    assert!(matches!(err, MemoryError::InvalidInput(_)));
    assert!(summarizer.calls().is_empty());
    assert_eq!(ids(&all_records(store.as_ref()).await), before);
}
