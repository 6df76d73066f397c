//! Stores and engines assembled from one config.

use crate::summarizer::ConcatSummarizer;
use log::info;
use mneme_rs_config::MnemeConfig;
use mneme_rs_memory::{
    Clock, FileShortTermStore, LongTermStore, MemoryError, RetentionEngine, RetrievalEngine,
    SqliteLongTermStore, Summarizer, SystemClock,
};
use std::path::Path;
use std::sync::Arc;

/// Short-term store, long-term store and both engines sharing one database.
pub struct MemorySystem {
    config: MnemeConfig,
    long_term: Arc<SqliteLongTermStore>,
    short_term: FileShortTermStore,
    retrieval: RetrievalEngine,
    retention: RetentionEngine,
}

impl MemorySystem {
    /// Open the stores under `base` with the wall clock and the concatenating summarizer.
    pub async fn open(config: MnemeConfig, base: &Path) -> Result<Self, MemoryError> {
        Self::open_with(
            config,
            base,
            Arc::new(SystemClock),
            Arc::new(ConcatSummarizer),
        )
        .await
    }

    /// Open the stores under `base` with explicit capabilities.
    pub async fn open_with(
        config: MnemeConfig,
        base: &Path,
        clock: Arc<dyn Clock>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self, MemoryError> {
        let long_term_path = config.storage.long_term_path(base);
        let short_term_path = config.storage.short_term_path(base);

        let long_term = Arc::new(
            SqliteLongTermStore::open(&long_term_path)?
                .with_clock(clock.clone())
                .with_truncation((&config.truncation).into()),
        );
        long_term.initialize().await?;
        let short_term = FileShortTermStore::new(&short_term_path)?;
        let retrieval = RetrievalEngine::with_policy(long_term.clone(), (&config.retrieval).into())?;
        let retention = RetentionEngine::new(long_term.clone(), summarizer)
            .with_clock(clock)
            .with_policy((&config.retention).into())?;

        info!(
            "memory system ready (long_term={}, short_term={})",
            long_term_path.display(),
            short_term_path.display()
        );
        Ok(Self {
            config,
            long_term,
            short_term,
            retrieval,
            retention,
        })
    }

    pub fn config(&self) -> &MnemeConfig {
        &self.config
    }

    /// Long-term store; also the conversation log.
    pub fn long_term(&self) -> &Arc<SqliteLongTermStore> {
        &self.long_term
    }

    pub fn short_term(&self) -> &FileShortTermStore {
        &self.short_term
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    pub fn retention(&self) -> &RetentionEngine {
        &self.retention
    }
}
