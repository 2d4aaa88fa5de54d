//! Cache Statistics Module
//!
//! Tracks cache performance metrics and builds the reporting snapshot.

use serde::Serialize;

// == Cache Stats ==
/// Running counters maintained by the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of successful insertions
    pub sets: u64,
    /// Number of explicit deletions (including tag/pattern/rule invalidation)
    pub deletes: u64,
    /// Number of entries removed to free capacity
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Bytes currently held, always equal to the sum of entry sizes
    pub size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Returns misses / (hits + misses), or 0.0 if no requests have been made.
    pub fn miss_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self, size: usize) {
        self.sets += 1;
        self.size += size;
    }

    pub fn record_delete(&mut self, size: usize) {
        self.deletes += 1;
        self.release(size);
    }

    pub fn record_eviction(&mut self, size: usize) {
        self.evictions += 1;
        self.release(size);
    }

    pub fn record_expiration(&mut self, size: usize) {
        self.expirations += 1;
        self.release(size);
    }

    /// Releases bytes without bumping any counter (overwrites).
    pub fn release(&mut self, size: usize) {
        self.size = self.size.saturating_sub(size);
    }
}

// == Stats Snapshot ==
/// A key with its access count, used for the top-accessed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessedItem {
    pub key: String,
    pub access_count: u64,
}

/// Point-in-time report returned by `Cache::stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub item_count: usize,
    pub hit_rate: f64,
    pub miss_rate: f64,
    /// size / max_size, in [0, 1]
    pub memory_utilization: f64,
    /// Key of the entry with the smallest `created_at`
    pub oldest_item: Option<String>,
    /// Key of the entry with the largest `created_at`
    pub newest_item: Option<String>,
    pub top_accessed_items: Vec<AccessedItem>,
}
