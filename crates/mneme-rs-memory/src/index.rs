//! In-memory category index derived from the long-term store.

use crate::error::MemoryError;
use crate::long_term::{LongTermStore, RecordFilter};
use crate::model::MemoryRecord;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Category label to record ids. Never the source of truth; rebuild at will.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    members: BTreeMap<String, BTreeSet<i64>>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from an explicit record set.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MemoryRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(&record.category, record.id);
        }
        index
    }

    /// Rebuild the index from everything currently in `store`.
    pub async fn rebuild(store: &dyn LongTermStore) -> Result<Self, MemoryError> {
        let records = store.select(&RecordFilter::all(), None).await?;
        let index = Self::from_records(&records);
        debug!(
            "rebuilt category index (categories={}, records={})",
            index.members.len(),
            index.len()
        );
        Ok(index)
    }

    pub fn insert(&mut self, category: &str, id: i64) {
        self.members.entry(category.to_string()).or_default().insert(id);
    }

    /// Remove an id; empty categories disappear from the index.
    pub fn remove(&mut self, category: &str, id: i64) -> bool {
        let Some(ids) = self.members.get_mut(category) else {
            return false;
        };
        let removed = ids.remove(&id);
        if ids.is_empty() {
            self.members.remove(category);
        }
        removed
    }

    /// Distinct categories in lexical order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Ids in a category, ascending. Empty if the category is unknown.
    pub fn ids_for(&self, category: &str) -> Vec<i64> {
        self.members
            .get(category)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.members.contains_key(category)
    }

    /// Total number of indexed records.
    pub fn len(&self) -> usize {
        self.members.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
