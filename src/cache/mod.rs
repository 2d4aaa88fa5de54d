//! Cache Module
//!
//! Storage core: entries and metadata, eviction strategies, key patterns
//! and statistics.

mod entry;
pub mod eviction;
mod pattern;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, estimate_size, Metadata, Priority, SetOptions, StoredEntry};
pub use eviction::{EvictionOutcome, EvictionPolicy, EvictionStrategy};
pub use pattern::KeyPattern;
pub use stats::{AccessedItem, CacheStats, StatsSnapshot};
pub use store::{CacheStore, InsertOutcome, Lookup, OptimizeReport, RemovedEntry};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Values above this many bytes are compressed when compression is requested
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;
