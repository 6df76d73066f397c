//! Durable, indexed long-term record store.

use crate::clock::{Clock, SystemClock};
use crate::error::MemoryError;
use crate::model::{CategoryStat, MemoryRecord};
use crate::policy::{TruncationPolicy, validate_limit};
use crate::schema;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row, params, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long a call waits for another writer's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ids bound per `id IN (...)` statement; SQLite caps host parameters.
pub(crate) const ID_CHUNK: usize = 500;

/// Conjunctive filter over long-term records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub ids: Option<Vec<i64>>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub older_than: Option<DateTime<Utc>>,
    pub permanent: Option<bool>,
}

impl RecordFilter {
    /// Filter matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ids(ids: Vec<i64>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Records strictly older than `cutoff`.
    pub fn older_than(cutoff: DateTime<Utc>) -> Self {
        Self {
            older_than: Some(cutoff),
            ..Self::default()
        }
    }

    /// Restrict to records with the given permanence flag.
    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = Some(permanent);
        self
    }

    /// Render the filter as a SQL `WHERE` clause plus bound parameters.
    fn to_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ids) = &self.ids {
            if ids.is_empty() {
                clauses.push("0".to_string());
            } else {
                let placeholders = vec!["?"; ids.len()].join(", ");
                clauses.push(format!("id IN ({placeholders})"));
                for id in ids {
                    values.push(Box::new(*id));
                }
            }
        }
        if let Some(category) = &self.category {
            clauses.push("category = ?".to_string());
            values.push(Box::new(category.clone()));
        }
        if let Some(content) = &self.content {
            clauses.push("content = ?".to_string());
            values.push(Box::new(content.clone()));
        }
        if let Some(cutoff) = &self.older_than {
            clauses.push("timestamp < ?".to_string());
            values.push(Box::new(*cutoff));
        }
        if let Some(permanent) = self.permanent {
            clauses.push("permanent = ?".to_string());
            values.push(Box::new(permanent));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

#[async_trait]
/// Long-term store abstraction used by the retrieval and retention engines.
///
/// Every method is one atomic unit of work against the backing medium. An
/// unreachable medium surfaces as `MemoryError::StorageUnavailable`, never as
/// an empty result.
pub trait LongTermStore: Send + Sync {
    /// Create tables and indexes if absent. Safe to call repeatedly.
    async fn initialize(&self) -> Result<(), MemoryError>;

    /// Append a record stamped with the store clock and return its id.
    ///
    /// The store's truncation policy is applied to `content`.
    async fn insert(
        &self,
        category: &str,
        content: &str,
        permanent: bool,
    ) -> Result<i64, MemoryError>;

    /// Append a record exactly as given, bypassing truncation.
    ///
    /// Retention summaries are written this way.
    async fn insert_verbatim(
        &self,
        category: &str,
        content: &str,
        permanent: bool,
    ) -> Result<i64, MemoryError>;

    /// Fetch records matching `filter`, most recent first.
    async fn select(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Distinct categories with their latest timestamp, most recent first.
    async fn categories(&self) -> Result<Vec<CategoryStat>, MemoryError>;

    /// Flip `permanent` on the oldest record whose content matches exactly.
    ///
    /// Returns whether a record matched; no match is not an error.
    async fn mark_permanent(&self, content: &str) -> Result<bool, MemoryError>;

    /// Delete non-permanent records matching `filter`, returning the count.
    async fn delete_where(&self, filter: &RecordFilter) -> Result<usize, MemoryError>;

    /// Store `summary` as a permanent record and delete the non-permanent
    /// records in `ids`, all in one transaction.
    ///
    /// Returns the summary id and the number of records deleted. On error
    /// neither the summary nor the deletions are kept.
    async fn replace_with_summary(
        &self,
        category: &str,
        summary: &str,
        ids: &[i64],
    ) -> Result<(i64, usize), MemoryError>;

    /// Clock used to stamp new records.
    fn clock(&self) -> Arc<dyn Clock>;

    /// Look up a single record by id.
    async fn get(&self, id: i64) -> Result<Option<MemoryRecord>, MemoryError> {
        let mut records = self.select(&RecordFilter::ids(vec![id]), Some(1)).await?;
        Ok(records.pop())
    }

    /// Most recent records in one category.
    async fn query_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        validate_limit(limit)?;
        self.select(&RecordFilter::category(category), Some(limit))
            .await
    }

    /// Most recent records regardless of category.
    async fn query_recent(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        validate_limit(limit)?;
        self.select(&RecordFilter::all(), Some(limit)).await
    }

    /// Administrative delete of every non-permanent record with this exact content.
    async fn delete_by_content(&self, content: &str) -> Result<usize, MemoryError> {
        self.delete_where(&RecordFilter::content(content)).await
    }
}

/// SQLite-backed long-term store.
///
/// One connection guarded by a mutex; the database runs in WAL mode with
/// `synchronous=FULL`, so a successful insert has been flushed.
pub struct SqliteLongTermStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    truncation: TruncationPolicy,
}

impl std::fmt::Debug for SqliteLongTermStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLongTermStore")
            .field("path", &self.path)
            .field("truncation", &self.truncation)
            .finish_non_exhaustive()
    }
}

impl SqliteLongTermStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                MemoryError::StorageUnavailable(format!(
                    "cannot create {}: {err}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(&path)?;
        let store = Self::from_connection(conn, Some(path))?;
        info!(
            "opened long-term store (path={})",
            store.path.as_deref().map_or_else(String::new, |p| p.display().to_string())
        );
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, MemoryError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        debug!("sqlite pragmas applied (journal_mode={mode})");
        schema::apply_schema(&conn)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            truncation: TruncationPolicy::default(),
        })
    }

    /// Replace the clock used to stamp new records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the truncation policy applied to every insert.
    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of the indexes defined on `table`.
    pub fn index_names(&self, table: &str) -> Result<Vec<String>, MemoryError> {
        let conn = self.conn.lock();
        Ok(schema::index_names(&conn, table)?)
    }

    pub(crate) fn truncation(&self) -> &TruncationPolicy {
        &self.truncation
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `op` against the connection while holding the lock.
    pub(crate) fn with_conn<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T, MemoryError> {
        let mut conn = self.conn.lock();
        Ok(op(&mut conn)?)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    Ok(MemoryRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        category: row.get(2)?,
        content: row.get(3)?,
        permanent: row.get(4)?,
    })
}

fn insert_row(
    conn: &Connection,
    timestamp: DateTime<Utc>,
    category: &str,
    content: &str,
    permanent: bool,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO memory (timestamp, category, content, permanent) VALUES (?1, ?2, ?3, ?4)",
        params![timestamp, category, content, permanent],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete the non-permanent records matching `filter`, splitting long id
/// lists into statements of at most `ID_CHUNK` ids.
fn delete_matching(conn: &Connection, filter: &RecordFilter) -> rusqlite::Result<usize> {
    let filter = filter.clone().with_permanent(false);
    let parts: Vec<RecordFilter> = match filter.ids.clone() {
        Some(ids) if ids.len() > ID_CHUNK => ids
            .chunks(ID_CHUNK)
            .map(|chunk| RecordFilter {
                ids: Some(chunk.to_vec()),
                ..filter.clone()
            })
            .collect(),
        _ => vec![filter],
    };
    let mut deleted = 0;
    for part in &parts {
        let (clause, values) = part.to_sql();
        deleted += conn.execute(
            &format!("DELETE FROM memory{clause}"),
            params_from_iter(values.iter()),
        )?;
    }
    Ok(deleted)
}

fn require_category(category: &str) -> Result<(), MemoryError> {
    if category.trim().is_empty() {
        return Err(MemoryError::InvalidInput(
            "category must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// SQLite binds limits as signed integers; "no limit" is -1.
pub(crate) fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX))
        .unwrap_or(-1)
}

#[async_trait]
impl LongTermStore for SqliteLongTermStore {
    async fn initialize(&self) -> Result<(), MemoryError> {
        self.with_conn(|conn| schema::apply_schema(conn))
    }

    async fn insert(
        &self,
        category: &str,
        content: &str,
        permanent: bool,
    ) -> Result<i64, MemoryError> {
        let content = self.truncation.apply(content);
        self.insert_verbatim(category, &content, permanent).await
    }

    async fn insert_verbatim(
        &self,
        category: &str,
        content: &str,
        permanent: bool,
    ) -> Result<i64, MemoryError> {
        require_category(category)?;
        let timestamp = self.now();
        let id = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let id = insert_row(&tx, timestamp, category, content, permanent)?;
            tx.commit()?;
            Ok(id)
        })?;
        debug!(
            "stored memory record (id={id}, category={category}, permanent={permanent}, content_len={})",
            content.len()
        );
        Ok(id)
    }

    async fn select(
        &self,
        filter: &RecordFilter,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let (clause, mut values) = filter.to_sql();
        values.push(Box::new(sql_limit(limit)));
        let sql = format!(
            "SELECT id, timestamp, category, content, permanent FROM memory{clause} \
             ORDER BY timestamp DESC, id DESC LIMIT ?"
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), record_from_row)?;
            rows.collect()
        })
    }

    async fn categories(&self) -> Result<Vec<CategoryStat>, MemoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, MAX(timestamp) AS latest FROM memory \
                 GROUP BY category ORDER BY latest DESC, category ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(CategoryStat {
                    category: row.get(0)?,
                    latest: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    async fn mark_permanent(&self, content: &str) -> Result<bool, MemoryError> {
        let updated = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE memory SET permanent = 1 WHERE id = \
                 (SELECT id FROM memory WHERE content = ?1 ORDER BY id ASC LIMIT 1)",
                params![content],
            )?;
            tx.commit()?;
            Ok(updated)
        })?;
        if updated == 0 {
            debug!("mark permanent found no record (content_len={})", content.len());
        } else {
            debug!("marked memory record permanent (content_len={})", content.len());
        }
        Ok(updated > 0)
    }

    async fn delete_where(&self, filter: &RecordFilter) -> Result<usize, MemoryError> {
        if filter.permanent == Some(true) {
            return Ok(0);
        }
        let deleted = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let deleted = delete_matching(&tx, filter)?;
            tx.commit()?;
            Ok(deleted)
        })?;
        debug!("deleted memory records (count={deleted})");
        Ok(deleted)
    }

    async fn replace_with_summary(
        &self,
        category: &str,
        summary: &str,
        ids: &[i64],
    ) -> Result<(i64, usize), MemoryError> {
        require_category(category)?;
        let timestamp = self.now();
        let filter = RecordFilter::ids(ids.to_vec());
        let (summary_id, deleted) = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let summary_id = insert_row(&tx, timestamp, category, summary, true)?;
            let deleted = delete_matching(&tx, &filter)?;
            tx.commit()?;
            Ok((summary_id, deleted))
        })?;
        debug!(
            "replaced memory records with summary (summary_id={summary_id}, deleted={deleted}, summary_len={})",
            summary.len()
        );
        Ok((summary_id, deleted))
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}
