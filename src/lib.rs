//! Cache Engine - An in-process, size-bounded key/value cache
//!
//! Provides LRU/LFU/FIFO eviction, TTL expiry, tag and pattern
//! invalidation, background warming, rule-driven invalidation and
//! optional compression, encryption and persistence.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod persistence;
pub mod tasks;
pub mod transform;

pub use api::AppState;
pub use cache::{EvictionStrategy, Priority, SetOptions, StatsSnapshot};
pub use config::{CacheConfig, Config};
pub use engine::{Cache, CacheBuilder};
pub use error::{CacheError, Result};
pub use invalidation::InvalidationRule;
pub use persistence::{FilePersistence, MemoryPersistence, PersistedRecord, PersistenceAdapter};
pub use tasks::WarmItem;
pub use transform::{Cipher, CompressionAlgorithm};
