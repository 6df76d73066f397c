//! Durability, permanence and retrieval properties of the stores.

use chrono::Duration;
use mneme_rs_memory::{
    CategoryIndex, LongTermStore, MemoryError, RecordFilter, RetrievalEngine, ShortTermStore,
    SqliteLongTermStore, fuzzy,
};
use mneme_rs_test_utils::{ManualClock, temp_stores};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

/// Records read back after reopening the database are field-for-field identical.
#[tokio::test]
async fn records_are_identical_after_restart() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");

    let mut inserted = Vec::new();
    for (category, content, permanent) in [
        ("work", "finish report", false),
        ("home", "water plants", true),
        ("work", "call client", false),
    ] {
        let id = stores
            .long_term
            .insert(category, content, permanent)
            .await
            .expect("insert");
        inserted.push(stores.long_term.get(id).await.expect("get").expect("record"));
        clock.advance(Duration::milliseconds(1_500));
    }

    let reopened = stores.reopen_long_term(clock.clone()).expect("reopen");
    reopened.initialize().await.expect("initialize");

    let mut recent = reopened.query_recent(10).await.expect("recent");
    recent.reverse();
    assert_eq!(recent, inserted);

    let work = reopened.query_by_category("work", 10).await.expect("work");
    assert_eq!(work, vec![inserted[2].clone(), inserted[0].clone()]);
}

/// Ids keep increasing across restarts and deletions.
#[tokio::test]
async fn ids_never_reused() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock.clone()).expect("stores");
    let first = stores.long_term.insert("a", "x", false).await.expect("first");
    stores.long_term.delete_by_content("x").await.expect("delete");

    let reopened = stores.reopen_long_term(clock).expect("reopen");
    let second = reopened.insert("a", "y", false).await.expect("second");
    assert!(second > first);
}

/// Marking the same content twice leaves the same state as marking it once.
#[tokio::test]
async fn mark_permanent_is_idempotent() {
    let once = SqliteLongTermStore::open_in_memory().expect("once");
    let twice = SqliteLongTermStore::open_in_memory().expect("twice");
    for store in [&once, &twice] {
        store.insert("notes", "keep me", false).await.expect("a");
        store.insert("notes", "other", false).await.expect("b");
    }

    assert!(once.mark_permanent("keep me").await.expect("mark"));
    assert!(twice.mark_permanent("keep me").await.expect("mark"));
    assert!(twice.mark_permanent("keep me").await.expect("mark again"));

    let flags = |records: Vec<mneme_rs_memory::MemoryRecord>| {
        records
            .into_iter()
            .map(|record| (record.id, record.content, record.permanent))
            .collect::<Vec<_>>()
    };
    let once_state = flags(once.select(&RecordFilter::all(), None).await.expect("once"));
    let twice_state = flags(twice.select(&RecordFilter::all(), None).await.expect("twice"));
    assert_eq!(once_state, twice_state);
}

/// Lowering the category threshold never returns fewer records.
#[tokio::test]
async fn category_threshold_is_monotonic() {
    let store = Arc::new(SqliteLongTermStore::open_in_memory().expect("store"));
    for (category, content) in [
        ("work", "finish report"),
        ("work", "call client"),
        ("home", "fix sink"),
        ("groceries", "buy milk"),
    ] {
        store.insert(category, content, false).await.expect("insert");
    }
    let engine = RetrievalEngine::new(store);

    for query in ["work", "wrk", "office stuff", "grocery", "xyz123"] {
        let mut previous = usize::MAX;
        for threshold in [0.0, 20.0, 40.0, 60.0, 80.0, 100.0] {
            let count = engine
                .retrieve_by_category_with_threshold(query, 10, threshold)
                .await
                .expect("retrieve")
                .len();
            assert!(
                count <= previous,
                "query={query} threshold={threshold} count={count} previous={previous}"
            );
            previous = count;
        }
    }
}

/// An exact category outranks an unrelated string, and the pick is stable.
#[tokio::test]
async fn category_match_is_deterministic() {
    let store = Arc::new(SqliteLongTermStore::open_in_memory().expect("store"));
    store.insert("work", "finish report", false).await.expect("a");
    store.insert("home", "fix sink", false).await.expect("b");
    let engine = RetrievalEngine::new(store);

    let first = engine.best_category_match("office stuff").await.expect("match");
    let second = engine.best_category_match("office stuff").await.expect("match");
    assert_eq!(first, second);
    let found = first.expect("some category");
    assert!((0.0..=100.0).contains(&found.score));

    assert!(fuzzy::ratio("work", "work") > fuzzy::ratio("work", "xyz123"));
    let exact = engine
        .best_category_match("work")
        .await
        .expect("match")
        .expect("some");
    assert_eq!(exact.category, "work");
    assert!(exact.score > found.score);
}

/// The category index can be dropped and rebuilt from the store at any time.
#[tokio::test]
async fn category_index_tracks_store() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock).expect("stores");
    let store = stores.long_term.clone();
    let a = store.insert("work", "a", false).await.expect("a");
    let b = store.insert("home", "b", false).await.expect("b");

    let index = CategoryIndex::rebuild(store.as_ref()).await.expect("rebuild");
    assert_eq!(index.categories().collect::<Vec<_>>(), vec!["home", "work"]);
    assert_eq!(index.ids_for("work"), vec![a]);
    assert_eq!(index.ids_for("home"), vec![b]);
}

/// A store whose file cannot be opened reports an error rather than an empty result.
#[tokio::test]
async fn unreachable_medium_is_an_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, "file").expect("write");

    let err = SqliteLongTermStore::open(blocker.join("long_term.db")).unwrap_err();
    assert!(matches!(err, MemoryError::StorageUnavailable(_)));
}

/// Interleaved load-mutate-save sequences lose the earlier write.
#[test]
fn short_term_appends_are_last_writer_wins() {
    let clock = Arc::new(ManualClock::epoch());
    let stores = temp_stores(clock).expect("stores");
    let short_term = &stores.short_term;

    let mut first = short_term.load().expect("first load");
    let mut second = short_term.load().expect("second load");
    first.entry("todo".to_string()).or_default().push(json!("from first"));
    second.entry("todo".to_string()).or_default().push(json!("from second"));
    short_term.save(&first).expect("first save");
    short_term.save(&second).expect("second save");

    assert_eq!(short_term.load().expect("load")["todo"], vec![json!("from second")]);
}
