//! Whole-document session memory.
//!
//! The short-term store keeps one JSON document mapping a category to an
//! ordered list of entries. Every save replaces the document.
//!
//! `append` is a plain load, mutate, save sequence. Two callers appending at
//! the same time can lose an update: the later save wins. Callers that need
//! to detect this use `compare_and_save`, which refuses to overwrite a
//! document that changed since it was read through the same handle.

use crate::error::MemoryError;
use log::{debug, info};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot of session memory: category to ordered entries.
pub type ShortTermSnapshot = BTreeMap<String, Vec<Value>>;

/// Session memory replaced wholesale on every save.
pub trait ShortTermStore: Send + Sync {
    /// Overwrite the persisted snapshot.
    fn save(&self, snapshot: &ShortTermSnapshot) -> Result<(), MemoryError>;

    /// Last saved snapshot, or an empty one if nothing was saved yet.
    fn load(&self) -> Result<ShortTermSnapshot, MemoryError>;

    /// Add one entry to one category (last writer wins under contention).
    fn append(&self, category: &str, entry: Value) -> Result<(), MemoryError> {
        let mut snapshot = self.load()?;
        snapshot.entry(category.to_string()).or_default().push(entry);
        self.save(&snapshot)
    }

    /// Save `next` only if the persisted snapshot still equals `expected`.
    fn compare_and_save(
        &self,
        expected: &ShortTermSnapshot,
        next: &ShortTermSnapshot,
    ) -> Result<bool, MemoryError>;
}

/// File-backed short-term store holding a single JSON document.
#[derive(Debug)]
pub struct FileShortTermStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileShortTermStore {
    /// Create a store writing to `path`; parent directories are created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("initialized short-term store (path={})", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the temporary document written before rename.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_snapshot(&self) -> Result<ShortTermSnapshot, MemoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ShortTermSnapshot::new());
            }
            Err(err) => return Err(MemoryError::Io(err)),
        };
        let snapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(snapshot)
    }

    /// Write the document to a temp file, then rename it into place.
    fn write_snapshot(&self, snapshot: &ShortTermSnapshot) -> Result<(), MemoryError> {
        let temp_path = self.temp_path();
        {
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;
        debug!(
            "saved short-term snapshot (categories={}, entries={})",
            snapshot.len(),
            snapshot.values().map(Vec::len).sum::<usize>()
        );
        Ok(())
    }
}

impl ShortTermStore for FileShortTermStore {
    fn save(&self, snapshot: &ShortTermSnapshot) -> Result<(), MemoryError> {
        let _guard = self.write_lock.lock();
        self.write_snapshot(snapshot)
    }

    fn load(&self) -> Result<ShortTermSnapshot, MemoryError> {
        self.read_snapshot()
    }

    fn compare_and_save(
        &self,
        expected: &ShortTermSnapshot,
        next: &ShortTermSnapshot,
    ) -> Result<bool, MemoryError> {
        let _guard = self.write_lock.lock();
        let current = self.read_snapshot()?;
        if &current != expected {
            debug!("short-term snapshot changed since read; save skipped");
            return Ok(false);
        }
        self.write_snapshot(next)?;
        Ok(true)
    }
}
