//! Public SDK surface for mneme.
//!
//! This crate re-exports the memory and config crates, wires them together
//! into a [`MemorySystem`], and provides a small initialization helper to
//! keep consumer setup consistent.

mod summarizer;
mod system;

/// Re-export for convenience.
pub use mneme_rs_config as config;
/// Re-export for convenience.
pub use mneme_rs_memory as memory;

pub use summarizer::ConcatSummarizer;
pub use system::MemorySystem;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
