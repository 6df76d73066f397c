use mneme_rs_memory::{Clock, FileShortTermStore, MemoryError, SqliteLongTermStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Stores rooted in a temp directory that lives as long as this value.
pub struct TempStores {
    pub dir: TempDir,
    pub long_term: Arc<SqliteLongTermStore>,
    pub short_term: FileShortTermStore,
}

impl TempStores {
    pub fn long_term_path(&self) -> PathBuf {
        self.dir.path().join("long_term_memory.db")
    }

    /// Open a second handle on the same database, as after a restart.
    pub fn reopen_long_term(&self, clock: Arc<dyn Clock>) -> Result<SqliteLongTermStore, MemoryError> {
        Ok(SqliteLongTermStore::open(self.long_term_path())?.with_clock(clock))
    }
}

/// Fresh file-backed stores using `clock` for new records.
pub fn temp_stores(clock: Arc<dyn Clock>) -> Result<TempStores, MemoryError> {
    let dir = tempfile::tempdir()?;
    let long_term =
        SqliteLongTermStore::open(dir.path().join("long_term_memory.db"))?.with_clock(clock);
    let short_term = FileShortTermStore::new(dir.path().join("short_term_memory.json"))?;
    Ok(TempStores {
        dir,
        long_term: Arc::new(long_term),
        short_term,
    })
}
