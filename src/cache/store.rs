//! Cache Store Module
//!
//! Synchronous storage core: one map of key to `StoredEntry`, the active
//! eviction policy and the running statistics. The async engine keeps a
//! single `CacheStore` behind one mutex, so every method here runs as one
//! atomic unit relative to other operations.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::cache::eviction::{EvictionOutcome, EvictionPolicy, EvictionStrategy};
use crate::cache::stats::{AccessedItem, CacheStats, StatsSnapshot};
use crate::cache::{KeyPattern, Metadata, Priority, StoredEntry};
use crate::error::{CacheError, Result};

/// Number of keys reported in `top_accessed_items`.
const TOP_ACCESSED_LIMIT: usize = 10;

// == Removed Entry ==
/// An entry taken out of the store, handed back so the caller can
/// forward the removal to persistence.
#[derive(Debug, Clone)]
pub struct RemovedEntry {
    pub key: String,
    pub entry: StoredEntry,
}

impl RemovedEntry {
    pub fn persisted(&self) -> bool {
        self.entry.metadata.persist
    }
}

// == Lookup ==
#[derive(Debug)]
pub enum Lookup {
    Hit(StoredEntry),
    Miss,
    /// The entry was found expired and has been removed
    Expired(RemovedEntry),
}

// == Insert Outcome ==
#[derive(Debug, Default)]
pub struct InsertOutcome {
    /// Entries evicted to make room
    pub evicted: Vec<RemovedEntry>,
    /// Previous entry under the same key, if any
    pub replaced: Option<StoredEntry>,
    /// Write stamp of the new entry, see [`CacheStore::generation`]
    pub generation: u64,
}

// == Optimize Report ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    pub expired_removed: usize,
    pub evicted: usize,
    pub bytes_freed: usize,
}

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    /// Key to value+metadata storage
    entries: HashMap<String, StoredEntry>,
    /// Eviction ordering
    policy: EvictionPolicy,
    /// Performance statistics
    stats: CacheStats,
    /// Byte capacity
    max_size: usize,
    /// Optional entry-count capacity
    max_entries: Option<usize>,
    /// Write stamp per live key
    generations: HashMap<String, u64>,
    last_generation: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `max_size` - Byte capacity
    /// * `max_entries` - Optional cap on the number of entries
    /// * `strategy` - Eviction strategy, fixed for the life of the store
    pub fn new(max_size: usize, max_entries: Option<usize>, strategy: EvictionStrategy) -> Self {
        Self {
            entries: HashMap::new(),
            policy: EvictionPolicy::new(strategy),
            stats: CacheStats::new(),
            max_size,
            max_entries,
            generations: HashMap::new(),
            last_generation: 0,
        }
    }

    // == Insert ==
    /// Stores an entry, evicting others when space is short.
    ///
    /// An existing entry under `key` is replaced and its bytes released
    /// before capacity is computed.
    pub fn insert(&mut self, key: String, entry: StoredEntry) -> Result<InsertOutcome> {
        self.install(key, entry, true)
    }

    /// Re-installs an entry loaded from persistence without counting a set.
    pub fn restore(&mut self, key: String, entry: StoredEntry) -> Result<InsertOutcome> {
        self.install(key, entry, false)
    }

    fn install(&mut self, key: String, entry: StoredEntry, count_set: bool) -> Result<InsertOutcome> {
        let size = entry.size();
        if size > self.max_size {
            return Err(CacheError::OversizedValue {
                size,
                max: self.max_size,
            });
        }

        let replaced = self.take(&key);
        if let Some(old) = &replaced {
            self.stats.release(old.size());
        }

        let evicted = self.ensure_space(size)?;

        self.policy.record_insert(&key, entry.metadata.created_at);
        if count_set {
            self.stats.record_set(size);
        } else {
            self.stats.size += size;
        }
        self.last_generation += 1;
        let generation = self.last_generation;
        self.generations.insert(key.clone(), generation);
        self.entries.insert(key, entry);

        Ok(InsertOutcome {
            evicted,
            replaced,
            generation,
        })
    }

    // == Ensure Space ==
    /// Evicts until `required` more bytes (and one more entry) fit.
    fn ensure_space(&mut self, required: usize) -> Result<Vec<RemovedEntry>> {
        let bytes_short = (self.stats.size + required).saturating_sub(self.max_size);
        let items_short = self
            .max_entries
            .map(|max| (self.entries.len() + 1).saturating_sub(max))
            .unwrap_or(0);

        if bytes_short == 0 && items_short == 0 {
            return Ok(Vec::new());
        }

        let (evicted, outcome) = self.evict(bytes_short, items_short);
        let items_ok = self
            .max_entries
            .map_or(true, |max| self.entries.len() < max);
        if self.stats.size + required > self.max_size || !items_ok {
            return Err(CacheError::EvictionInsufficient {
                required: bytes_short,
                freed: outcome.memory_freed,
            });
        }

        Ok(evicted)
    }

    // == Evict ==
    /// Removes entries in policy order until `bytes_to_free` bytes and
    /// `items_to_free` entries have been released, or the store is empty.
    ///
    /// Within the policy order, `Low` priority entries go first, then
    /// `Normal`, then `High`.
    pub fn evict(
        &mut self,
        bytes_to_free: usize,
        items_to_free: usize,
    ) -> (Vec<RemovedEntry>, EvictionOutcome) {
        let victims = self.select_victims(bytes_to_free, items_to_free);
        let mut outcome = EvictionOutcome::default();
        let mut removed = Vec::with_capacity(victims.len());

        for key in victims {
            if let Some(entry) = self.take(&key) {
                self.stats.record_eviction(entry.size());
                outcome.items_removed += 1;
                outcome.memory_freed += entry.size();
                removed.push(RemovedEntry { key, entry });
            }
        }

        if outcome.items_removed > 0 {
            debug!(
                "Evicted {} entries ({} bytes) using {}",
                outcome.items_removed,
                outcome.memory_freed,
                self.policy.strategy()
            );
        }
        (removed, outcome)
    }

    fn select_victims(&self, bytes_to_free: usize, items_to_free: usize) -> Vec<String> {
        let mut chosen = Vec::new();
        let mut freed = 0;

        for tier in [Priority::Low, Priority::Normal, Priority::High] {
            for key in self.policy.candidates() {
                if freed >= bytes_to_free && chosen.len() >= items_to_free {
                    return chosen;
                }
                match self.entries.get(key) {
                    Some(entry) if entry.metadata.priority == tier => {
                        freed += entry.size();
                        chosen.push(key.to_string());
                    }
                    _ => {}
                }
            }
        }
        chosen
    }

    // == Get ==
    /// Looks up a key, recording a hit or a miss.
    ///
    /// Expired entries are removed on the spot and count as misses.
    pub fn get(&mut self, key: &str, now: u64) -> Lookup {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
            Some(entry) => entry.metadata.is_expired_at(now),
        };

        if expired {
            self.stats.record_miss();
            return match self.expire(key) {
                Some(removed) => Lookup::Expired(removed),
                None => Lookup::Miss,
            };
        }

        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Miss;
        };
        entry.metadata.record_access(now);
        let hit = entry.clone();
        self.policy.record_access(key);
        self.stats.record_hit();
        Lookup::Hit(hit)
    }

    // == Has ==
    /// Existence check honoring expiry. Access stats are left untouched.
    pub fn has(&mut self, key: &str, now: u64) -> (bool, Option<RemovedEntry>) {
        match self.entries.get(key) {
            None => (false, None),
            Some(entry) if entry.metadata.is_expired_at(now) => (false, self.expire(key)),
            Some(_) => (true, None),
        }
    }

    // == Delete ==
    /// Removes an entry, counting it as a delete.
    pub fn remove(&mut self, key: &str) -> Option<StoredEntry> {
        let entry = self.take(key)?;
        self.stats.record_delete(entry.size());
        Some(entry)
    }

    /// Removes an entry only if it is still expired at `now`.
    pub fn remove_if_expired(&mut self, key: &str, now: u64) -> Option<RemovedEntry> {
        let expired = self
            .entries
            .get(key)
            .map_or(false, |e| e.metadata.is_expired_at(now));
        if expired {
            self.expire(key)
        } else {
            None
        }
    }

    fn expire(&mut self, key: &str) -> Option<RemovedEntry> {
        let entry = self.take(key)?;
        self.stats.record_expiration(entry.size());
        Some(RemovedEntry {
            key: key.to_string(),
            entry,
        })
    }

    /// Removes from both the map and the policy. The caller releases the
    /// bytes through the matching stats counter.
    fn take(&mut self, key: &str) -> Option<StoredEntry> {
        let entry = self.entries.remove(key)?;
        self.generations.remove(key);
        self.policy.remove(key);
        Some(entry)
    }

    /// Live entry under `key`, ignoring expiry and leaving stats alone.
    pub fn peek(&self, key: &str) -> Option<&StoredEntry> {
        self.entries.get(key)
    }

    /// Stamp of the write that installed the live entry under `key`.
    ///
    /// Every insert or restore gets a fresh stamp, so two writes of the
    /// same key never share one.
    pub fn generation(&self, key: &str) -> Option<u64> {
        self.generations.get(key).copied()
    }

    // == Scans ==
    /// Keys whose entries are expired at `now`.
    pub fn expired_keys(&self, now: u64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.metadata.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Live entries carrying any of `tags`.
    pub fn tagged<S: AsRef<str>>(&self, tags: &[S], now: u64) -> Vec<(String, StoredEntry)> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.metadata.is_expired_at(now) && e.metadata.has_any_tag(tags))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect()
    }

    /// Keys carrying any of `tags`, expired or not.
    pub fn keys_with_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        self.keys_where(|_, meta| meta.has_any_tag(tags))
    }

    pub fn keys_matching(&self, pattern: &KeyPattern) -> Vec<String> {
        self.keys_where(|key, _| pattern.matches(key))
    }

    pub fn keys_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str, &Metadata) -> bool,
    {
        self.entries
            .iter()
            .filter(|(k, e)| predicate(k, &e.metadata))
            .map(|(k, _)| k.clone())
            .collect()
    }

    // == Optimize ==
    /// Purges expired entries, then evicts down to `target` utilization if
    /// utilization is above `high_water`.
    pub fn optimize(
        &mut self,
        now: u64,
        high_water: f64,
        target: f64,
    ) -> (OptimizeReport, Vec<RemovedEntry>) {
        let mut report = OptimizeReport::default();
        let mut removed = Vec::new();

        for key in self.expired_keys(now) {
            if let Some(gone) = self.expire(&key) {
                report.expired_removed += 1;
                report.bytes_freed += gone.entry.size();
                removed.push(gone);
            }
        }

        if self.utilization() > high_water {
            let target_bytes = (self.max_size as f64 * target) as usize;
            let excess = self.stats.size.saturating_sub(target_bytes);
            let (evicted, outcome) = self.evict(excess, 0);
            report.evicted = outcome.items_removed;
            report.bytes_freed += outcome.memory_freed;
            removed.extend(evicted);
        }

        (report, removed)
    }

    // == Clear ==
    /// Drops every entry and resets all counters.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.generations.clear();
        self.policy.clear();
        self.stats = CacheStats::new();
        count
    }

    // == Stats ==
    /// Returns a copy of the running counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Builds the full statistics report.
    pub fn snapshot(&self) -> StatsSnapshot {
        let oldest_item = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.metadata.created_at)
            .map(|(k, _)| k.clone());
        let newest_item = self
            .entries
            .iter()
            .max_by_key(|(_, e)| e.metadata.created_at)
            .map(|(k, _)| k.clone());

        let mut accessed: Vec<AccessedItem> = self
            .entries
            .iter()
            .filter(|(_, e)| e.metadata.access_count > 0)
            .map(|(k, e)| AccessedItem {
                key: k.clone(),
                access_count: e.metadata.access_count,
            })
            .collect();
        accessed.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        accessed.truncate(TOP_ACCESSED_LIMIT);

        StatsSnapshot {
            hits: self.stats.hits,
            misses: self.stats.misses,
            sets: self.stats.sets,
            deletes: self.stats.deletes,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
            size: self.stats.size,
            item_count: self.entries.len(),
            hit_rate: self.stats.hit_rate(),
            miss_rate: self.stats.miss_rate(),
            memory_utilization: self.utilization(),
            oldest_item,
            newest_item,
            top_accessed_items: accessed,
        }
    }

    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.stats.size as f64 / self.max_size as f64
        }
    }

    /// Sum of entry sizes, recomputed from scratch.
    pub fn computed_size(&self) -> usize {
        self.entries.values().map(StoredEntry::size).sum()
    }

    pub fn total_size(&self) -> usize {
        self.stats.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.policy.strategy()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{estimate_size, SetOptions};
    use std::time::Duration;

    const NOW: u64 = 1_000_000;

    fn entry_at(key: &str, value: &str, opts: &SetOptions, ttl: Duration, now: u64) -> StoredEntry {
        let value = value.as_bytes().to_vec();
        let size = estimate_size(key, &value);
        StoredEntry {
            value,
            metadata: Metadata::new(opts, ttl, size, now),
        }
    }

    fn entry(key: &str, value: &str) -> StoredEntry {
        entry_at(key, value, &SetOptions::new(), Duration::from_secs(300), NOW)
    }

    fn put(store: &mut CacheStore, key: &str, value: &str) -> InsertOutcome {
        store.insert(key.to_string(), entry(key, value)).unwrap()
    }

    fn value_of(store: &mut CacheStore, key: &str) -> Option<String> {
        match store.get(key, NOW) {
            Lookup::Hit(e) => Some(String::from_utf8(e.value).unwrap()),
            _ => None,
        }
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_insert_and_get() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "key1", "value1");

        assert_eq!(value_of(&mut store, "key1").as_deref(), Some("value1"));
        assert_eq!(store.total_size(), 10);
        assert_eq!(store.stats().sets, 1);
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn test_store_get_records_access() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "k", "v");

        store.get("k", NOW + 5);
        match store.get("k", NOW + 9) {
            Lookup::Hit(e) => {
                assert_eq!(e.metadata.access_count, 2);
                assert_eq!(e.metadata.last_accessed, NOW + 9);
            }
            other => panic!("expected hit, got {:?}", other),
        }
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        assert!(matches!(store.get("nonexistent", NOW), Lookup::Miss));
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_lazy_expiry() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        let e = entry_at("k", "v", &SetOptions::new(), Duration::from_millis(50), NOW);
        store.insert("k".to_string(), e).unwrap();

        assert!(matches!(store.get("k", NOW + 50), Lookup::Hit(_)));
        assert!(matches!(store.get("k", NOW + 51), Lookup::Expired(_)));
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        assert_eq!(store.stats().expirations, 1);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_has_honors_expiry_without_stats() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        let e = entry_at("k", "v", &SetOptions::new(), Duration::from_millis(10), NOW);
        store.insert("k".to_string(), e).unwrap();

        assert!(store.has("k", NOW).0);
        let (present, removed) = store.has("k", NOW + 11);
        assert!(!present);
        assert!(removed.is_some());
        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "key1", "value1");

        assert!(store.remove("key1").is_some());
        assert!(store.remove("key1").is_none());
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        assert_eq!(store.stats().deletes, 1);
    }

    #[test]
    fn test_store_overwrite_replaces_size() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "key1", "value1");
        let outcome = put(&mut store, "key1", "v2");

        assert!(outcome.replaced.is_some());
        assert_eq!(value_of(&mut store, "key1").as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), store.computed_size());
    }

    #[test]
    fn test_store_rejects_oversized() {
        let mut store = CacheStore::new(8, None, EvictionStrategy::Lru);
        put(&mut store, "a", "b");

        let result = store.insert("key".to_string(), entry("key", "too-large"));
        assert!(matches!(result, Err(CacheError::OversizedValue { size: 12, max: 8 })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lru_eviction_order() {
        // Room for exactly two 5-byte entries
        let mut store = CacheStore::new(10, None, EvictionStrategy::Lru);
        put(&mut store, "a", "1111");
        put(&mut store, "b", "2222");
        store.get("a", NOW);
        let outcome = put(&mut store, "c", "3333");

        assert_eq!(outcome.evicted.len(), 1);
        assert_eq!(outcome.evicted[0].key, "b");
        assert!(store.contains_key("a"));
        assert!(store.contains_key("c"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_fifo_entry_cap() {
        let mut store = CacheStore::new(1024, Some(3), EvictionStrategy::Fifo);
        put(&mut store, "k1", "v");
        put(&mut store, "k2", "v");
        put(&mut store, "k3", "v");
        store.get("k1", NOW);
        put(&mut store, "k4", "v");

        assert!(!store.contains_key("k1"));
        for key in ["k2", "k3", "k4"] {
            assert!(store.contains_key(key));
        }
    }

    #[test]
    fn test_store_lfu_evicts_least_frequent() {
        let mut store = CacheStore::new(1024, Some(2), EvictionStrategy::Lfu);
        put(&mut store, "hot", "v");
        put(&mut store, "cold", "v");
        store.get("hot", NOW);
        store.get("hot", NOW);
        put(&mut store, "new", "v");

        assert!(store.contains_key("hot"));
        assert!(!store.contains_key("cold"));
    }

    #[test]
    fn test_store_high_priority_evicted_last() {
        let mut store = CacheStore::new(1024, Some(2), EvictionStrategy::Lru);
        let high = SetOptions::new().priority(Priority::High);
        store
            .insert("vip".to_string(), entry_at("vip", "v", &high, Duration::ZERO, NOW))
            .unwrap();
        put(&mut store, "plain", "v");
        put(&mut store, "next", "v");

        assert!(store.contains_key("vip"));
        assert!(!store.contains_key("plain"));
    }

    #[test]
    fn test_store_low_priority_evicted_first() {
        let mut store = CacheStore::new(1024, Some(2), EvictionStrategy::Lru);
        put(&mut store, "plain", "v");
        let low = SetOptions::new().priority(Priority::Low);
        store
            .insert("cheap".to_string(), entry_at("cheap", "v", &low, Duration::ZERO, NOW))
            .unwrap();
        put(&mut store, "next", "v");

        assert!(store.contains_key("plain"));
        assert!(!store.contains_key("cheap"));
    }

    #[test]
    fn test_store_evict_drains_when_asked_for_everything() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "a", "1");
        put(&mut store, "b", "2");

        let (removed, outcome) = store.evict(usize::MAX, 0);
        assert_eq!(removed.len(), 2);
        assert_eq!(outcome.memory_freed, 4);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_tag_scans() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        let user = SetOptions::new().tags(["user"]);
        let ttl = Duration::from_secs(60);
        store.insert("u1".into(), entry_at("u1", "a", &user, ttl, NOW)).unwrap();
        store.insert("u2".into(), entry_at("u2", "b", &user, ttl, NOW)).unwrap();
        put(&mut store, "other", "c");

        let mut keys = store.keys_with_any_tag(&["user", "absent"]);
        keys.sort();
        assert_eq!(keys, vec!["u1", "u2"]);
        assert_eq!(store.tagged(&["user"], NOW).len(), 2);
        assert!(store.tagged(&["user"], NOW + 61_000).is_empty());
    }

    #[test]
    fn test_store_keys_matching() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "ocr:1", "a");
        put(&mut store, "ocr:2", "b");
        put(&mut store, "ai:1", "c");

        let pattern = KeyPattern::parse("ocr:*").unwrap();
        assert_eq!(store.keys_matching(&pattern).len(), 2);
    }

    #[test]
    fn test_store_remove_if_expired_rechecks() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        let e = entry_at("k", "v", &SetOptions::new(), Duration::from_millis(10), NOW);
        store.insert("k".to_string(), e).unwrap();

        assert!(store.remove_if_expired("k", NOW).is_none());
        assert_eq!(store.expired_keys(NOW + 20), vec!["k".to_string()]);
        assert!(store.remove_if_expired("k", NOW + 20).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_optimize() {
        let mut store = CacheStore::new(100, None, EvictionStrategy::Lru);
        let short = entry_at("gone", "", &SetOptions::new(), Duration::from_millis(1), NOW);
        store.insert("gone".to_string(), short).unwrap();
        for i in 0..8 {
            let key = format!("k{}", i);
            put(&mut store, &key, "1234567890");
        }
        assert_eq!(store.len(), 9);
        assert!(store.utilization() > 0.9);

        let (report, removed) = store.optimize(NOW + 10, 0.9, 0.75);
        assert_eq!(report.expired_removed, 1);
        assert!(report.evicted > 0);
        assert_eq!(removed.len(), report.expired_removed + report.evicted);
        assert!(store.utilization() <= 0.75);
        assert_eq!(store.total_size(), store.computed_size());
    }

    #[test]
    fn test_store_snapshot() {
        let mut store = CacheStore::new(1000, None, EvictionStrategy::Lru);
        let opts = SetOptions::new();
        let ttl = Duration::ZERO;
        store.insert("old".into(), entry_at("old", "v", &opts, ttl, NOW)).unwrap();
        store.insert("new".into(), entry_at("new", "v", &opts, ttl, NOW + 10)).unwrap();
        store.get("new", NOW + 11);
        store.get("new", NOW + 12);
        store.get("old", NOW + 13);
        store.get("missing", NOW + 14);

        let snap = store.snapshot();
        assert_eq!(snap.item_count, 2);
        assert_eq!(snap.size, 8);
        assert_eq!(snap.hits, 3);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.oldest_item.as_deref(), Some("old"));
        assert_eq!(snap.newest_item.as_deref(), Some("new"));
        assert_eq!(snap.top_accessed_items[0].key, "new");
        assert_eq!(snap.top_accessed_items[0].access_count, 2);
        assert!((snap.memory_utilization - 0.008).abs() < 1e-9);
    }

    #[test]
    fn test_store_clear_resets_everything() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        put(&mut store, "a", "1");
        store.get("a", NOW);

        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_generation_changes_on_every_write() {
        let mut store = CacheStore::new(1024, None, EvictionStrategy::Lru);
        let first = put(&mut store, "a", "1").generation;
        assert_eq!(store.generation("a"), Some(first));

        let second = put(&mut store, "a", "2").generation;
        assert_ne!(first, second);
        assert_eq!(store.generation("a"), Some(second));

        store.remove("a");
        assert_eq!(store.generation("a"), None);
        assert!(store.peek("a").is_none());

        put(&mut store, "b", "1");
        store.clear();
        assert_eq!(store.generation("b"), None);
    }
}
