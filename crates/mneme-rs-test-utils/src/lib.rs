//! Test helpers shared across mneme crates.

pub mod clock;
pub mod store;
pub mod summarizer;

pub use clock::ManualClock;
pub use store::{TempStores, temp_stores};
pub use summarizer::{FailingSummarizer, FixedSummarizer, RecordingSummarizer};
