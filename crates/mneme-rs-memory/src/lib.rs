//! Persistent short-term and long-term memory with fuzzy recall and
//! summarize-before-evict retention.

pub mod clock;
pub mod conversation;
pub mod error;
pub mod fuzzy;
pub mod index;
pub mod long_term;
pub mod model;
pub mod policy;
pub mod retention;
pub mod retrieval;
mod schema;
pub mod short_term;
pub mod summarizer;

/// Time source capability.
pub use clock::{Clock, SystemClock};
/// Conversation log.
pub use conversation::{ConversationLog, DEFAULT_CONVERSATION_THRESHOLD};
/// Memory error type.
pub use error::MemoryError;
/// Derived category index.
pub use index::CategoryIndex;
/// Long-term store interface and SQLite implementation.
pub use long_term::{LongTermStore, RecordFilter, SqliteLongTermStore};
/// Record models.
pub use model::{CategoryStat, ConversationRecord, MemoryRecord, SUMMARY_CATEGORY, ScoredRecord};
/// Truncation, retrieval and retention policies.
pub use policy::{DEFAULT_TRUNCATION_MARKER, RetentionPolicy, RetrievalPolicy, TruncationPolicy};
/// Retention sweeps.
pub use retention::{RetentionEngine, RetentionPhase, RetentionReport};
/// Fuzzy retrieval.
pub use retrieval::{CategoryMatch, RetrievalEngine};
/// Short-term session memory.
pub use short_term::{FileShortTermStore, ShortTermSnapshot, ShortTermStore};
/// Summarizer capability.
pub use summarizer::{Summarizer, SummarizerError, SummaryEntry};
