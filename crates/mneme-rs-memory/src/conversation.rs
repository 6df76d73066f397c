//! Conversation log kept alongside long-term memory.

use crate::error::MemoryError;
use crate::fuzzy::partial_ratio_ignore_case;
use crate::long_term::{SqliteLongTermStore, sql_limit};
use crate::model::{ConversationRecord, ScoredRecord};
use crate::policy::{validate_limit, validate_threshold};
use async_trait::async_trait;
use log::debug;
use rusqlite::{Row, params};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Default partial-match threshold for conversation search.
pub const DEFAULT_CONVERSATION_THRESHOLD: f64 = 70.0;

#[async_trait]
/// Storage for user/assistant exchanges.
pub trait ConversationLog: Send + Sync {
    /// Append an exchange and return its id.
    async fn record_conversation(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> Result<i64, MemoryError>;

    /// Conversations ranked by user message length, then recency.
    async fn recent_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, MemoryError>;

    /// Every conversation, most recent first.
    async fn all_conversations(&self) -> Result<Vec<ConversationRecord>, MemoryError>;

    /// Delete all but the `keep_latest` most recent conversations.
    async fn prune_conversations(&self, keep_latest: usize) -> Result<usize, MemoryError>;

    /// Like `recent_conversations`, keeping the first entry per distinct user message.
    ///
    /// Up to `limit` distinct messages are returned; the fetch window doubles
    /// until enough are found or the log is exhausted.
    async fn recent_unique_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, MemoryError> {
        validate_limit(limit)?;
        let mut fetch = limit;
        loop {
            let batch = self.recent_conversations(fetch).await?;
            let exhausted = batch.len() < fetch;
            let mut seen = HashSet::new();
            let unique: Vec<_> = batch
                .into_iter()
                .filter(|record| seen.insert(record.user_message.clone()))
                .take(limit)
                .collect();
            if unique.len() == limit || exhausted || fetch == usize::MAX {
                return Ok(unique);
            }
            fetch = fetch.saturating_mul(2);
        }
    }

    /// Fuzzy search over user messages, best score first then most recent.
    async fn search_conversations(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Result<Vec<ScoredRecord<ConversationRecord>>, MemoryError> {
        validate_limit(limit)?;
        validate_threshold(threshold)?;
        let mut hits: Vec<_> = self
            .all_conversations()
            .await?
            .into_iter()
            .filter_map(|record| {
                let score = partial_ratio_ignore_case(query, &record.user_message);
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
        Ok(hits)
    }
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: row.get(0)?,
        user_message: row.get(1)?,
        ai_response: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

#[async_trait]
impl ConversationLog for SqliteLongTermStore {
    async fn record_conversation(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> Result<i64, MemoryError> {
        let ai_response = self.truncation().apply(ai_response);
        let timestamp = self.now();
        let id = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (user_message, ai_response, timestamp) VALUES (?1, ?2, ?3)",
                params![user_message, ai_response, timestamp],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })?;
        debug!(
            "stored conversation (id={id}, user_len={}, response_len={})",
            user_message.len(),
            ai_response.len()
        );
        Ok(id)
    }

    async fn recent_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>, MemoryError> {
        validate_limit(limit)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_message, ai_response, timestamp FROM conversations \
                 ORDER BY LENGTH(user_message) DESC, timestamp DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![sql_limit(Some(limit))], conversation_from_row)?;
            rows.collect()
        })
    }

    async fn all_conversations(&self) -> Result<Vec<ConversationRecord>, MemoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_message, ai_response, timestamp FROM conversations \
                 ORDER BY timestamp DESC, id DESC",
            )?;
            let rows = stmt.query_map([], conversation_from_row)?;
            rows.collect()
        })
    }

    async fn prune_conversations(&self, keep_latest: usize) -> Result<usize, MemoryError> {
        let deleted = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM conversations WHERE id NOT IN \
                 (SELECT id FROM conversations ORDER BY timestamp DESC, id DESC LIMIT ?1)",
                params![sql_limit(Some(keep_latest))],
            )?;
            tx.commit()?;
            Ok(deleted)
        })?;
        debug!("pruned conversations (keep_latest={keep_latest}, deleted={deleted})");
        Ok(deleted)
    }
}
