//! On-disk layout of the long-term database.

use rusqlite::Connection;

/// Idempotent schema: record tables plus the category and recency indexes.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    category TEXT NOT NULL,
    content TEXT NOT NULL,
    permanent INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_memory_category ON memory (category, timestamp);
CREATE INDEX IF NOT EXISTS idx_memory_timestamp ON memory (timestamp);
CREATE INDEX IF NOT EXISTS idx_memory_permanent_timestamp ON memory (permanent, timestamp);
CREATE INDEX IF NOT EXISTS idx_memory_content ON memory (content);

CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_message TEXT NOT NULL,
    ai_response TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations (timestamp);
";

/// Create tables and indexes if absent.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

/// Names of the indexes present on a table, for diagnostics and tests.
pub(crate) fn index_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 \
         AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    rows.collect()
}
