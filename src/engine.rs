//! Cache Engine
//!
//! The asynchronous public face of the cache. A [`Cache`] wraps one
//! [`CacheStore`] behind a single mutex and layers the transform pipeline,
//! persistence forwarding, warming, rule-based invalidation and the expiry
//! sweep on top of it.
//!
//! The store lock is only held while the map is mutated. Compression,
//! encryption and persistence I/O run outside of it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{
    current_timestamp_ms, estimate_size, CacheStore, Lookup, Metadata, OptimizeReport,
    RemovedEntry, SetOptions, StatsSnapshot, StoredEntry, KeyPattern, MAX_KEY_LENGTH,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::invalidation::InvalidationRule;
use crate::persistence::{PersistedRecord, PersistenceAdapter};
use crate::tasks::{WarmItem, WarmQueue, Worker};
use crate::transform::{Cipher, Compressor, TransformPipeline};

/// `optimize()` evicts when utilization is above this fraction...
const OPTIMIZE_HIGH_WATER: f64 = 0.9;
/// ...down to this fraction of `max_size`.
const OPTIMIZE_TARGET: f64 = 0.75;

// == Builder ==
/// Assembles a [`Cache`] from its configuration and optional collaborators.
pub struct CacheBuilder {
    config: CacheConfig,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    cipher: Option<Arc<dyn Cipher>>,
}

impl CacheBuilder {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            persistence: None,
            cipher: None,
        }
    }

    /// Persistence backend, used when `persistence_enabled` is set.
    pub fn persistence(mut self, adapter: Arc<dyn PersistenceAdapter>) -> Self {
        self.persistence = Some(adapter);
        self
    }

    /// Cipher, used when `encryption_enabled` is set.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Builds the cache and restores the persisted snapshot, if any.
    pub async fn build(self) -> Result<Cache> {
        let cache = self.build_detached()?;
        cache.restore().await;
        Ok(cache)
    }

    /// Builds the cache without touching persistence.
    fn build_detached(self) -> Result<Cache> {
        let config = self.config;
        config.validate()?;

        if config.encryption_enabled && self.cipher.is_none() {
            return Err(CacheError::Config(
                "encryption_enabled requires a cipher".to_string(),
            ));
        }
        if config.persistence_enabled && self.persistence.is_none() {
            return Err(CacheError::Config(
                "persistence_enabled requires a persistence adapter".to_string(),
            ));
        }

        let compressor = config
            .compression_enabled
            .then(|| Compressor::new(config.compression_algorithm));
        let cipher = if config.encryption_enabled {
            self.cipher
        } else {
            None
        };
        let pipeline = TransformPipeline::new(compressor, config.compression_threshold, cipher);
        let persistence = if config.persistence_enabled {
            self.persistence
        } else {
            None
        };

        let store = CacheStore::new(config.max_size, config.max_entries, config.strategy);
        info!(
            "Cache created: max_size={} bytes, strategy={}, default_ttl={:?}",
            config.max_size, config.strategy, config.default_ttl
        );

        Ok(Cache {
            inner: Arc::new(CacheInner {
                config,
                store: Mutex::new(store),
                pipeline,
                persistence,
                warm_queue: WarmQueue::new(),
                rules: RwLock::new(Vec::new()),
                sweeper: Worker::new("expiry-sweep"),
                warmer: Worker::new("warming"),
                invalidator: Worker::new("invalidator"),
            }),
        })
    }
}

// == Cache ==
struct CacheInner {
    config: CacheConfig,
    store: Mutex<CacheStore>,
    pipeline: TransformPipeline,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
    warm_queue: WarmQueue,
    rules: RwLock<Vec<InvalidationRule>>,
    sweeper: Worker,
    warmer: Worker,
    invalidator: Worker,
}

/// Cheaply cloneable handle to a cache instance.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl Cache {
    /// Creates a cache with no persistence and no cipher.
    pub fn new(config: CacheConfig) -> Result<Self> {
        CacheBuilder::new(config).build_detached()
    }

    pub fn builder(config: CacheConfig) -> CacheBuilder {
        CacheBuilder::new(config)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Get ==
    /// Returns the value for `key`, or `NotFound` if absent or expired.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let lookup = self.inner.store.lock().await.get(key, current_timestamp_ms());

        match lookup {
            Lookup::Hit(entry) => self.decode(key, &entry),
            Lookup::Miss => Err(CacheError::NotFound(key.to_string())),
            Lookup::Expired(removed) => {
                debug!("Key '{}' expired on access", key);
                self.forget(&[removed]).await;
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    /// Reads a JSON value stored with [`Cache::set_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self.get(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn decode(&self, key: &str, entry: &StoredEntry) -> Result<Vec<u8>> {
        self.inner
            .pipeline
            .reverse(&entry.value, entry.metadata.compressed, entry.metadata.encrypted)
            .map_err(|e| {
                warn!("Failed to decode value for '{}': {}", key, e);
                e
            })
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Fails with `OversizedValue` when the entry alone exceeds `max_size`;
    /// otherwise evicts as needed. Persistence failures are logged only.
    ///
    /// The record is written after the store lock is released. If the key
    /// was deleted or rewritten meanwhile, the backend is re-synced with
    /// whatever is live once the save returns, so a concurrent `delete`
    /// cannot leave this record behind for the next restore.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        options: SetOptions,
    ) -> Result<()> {
        let key = key.into();
        validate_key(&key)?;

        let config = &self.inner.config;
        let transformed = self.inner.pipeline.transform(
            value.into(),
            options.compress && config.compression_enabled,
            options.encrypt && config.encryption_enabled,
        )?;

        let size = estimate_size(&key, &transformed.bytes);
        let ttl = options.ttl.unwrap_or(config.default_ttl);
        let mut metadata = Metadata::new(&options, ttl, size, current_timestamp_ms());
        metadata.compressed = transformed.compressed;
        metadata.encrypted = transformed.encrypted;
        metadata.persist = options.persist && self.inner.persistence.is_some();

        let record = metadata.persist.then(|| PersistedRecord {
            key: key.clone(),
            value: transformed.bytes.clone(),
            metadata: metadata.clone(),
        });
        let entry = StoredEntry {
            value: transformed.bytes,
            metadata,
        };

        let result = self.inner.store.lock().await.insert(key.clone(), entry);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_capacity_error() {
                    warn!("Rejected '{}': {}", key, e);
                }
                return Err(e);
            }
        };

        self.forget(&outcome.evicted).await;
        if let Some(old) = outcome.replaced {
            if old.metadata.persist && record.is_none() {
                self.persist_delete(&key).await;
            }
        }
        if let Some(record) = record {
            self.persist_save(record).await;
            self.resync_persisted(&key, outcome.generation).await;
        }
        Ok(())
    }

    /// Serializes `value` as JSON and stores it.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes, options).await
    }

    // == Delete ==
    /// Removes `key`. Returns false, leaving stats untouched, if absent.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.inner.store.lock().await.remove(key);
        match removed {
            Some(entry) => {
                if entry.metadata.persist {
                    self.persist_delete(key).await;
                }
                true
            }
            None => false,
        }
    }

    // == Has ==
    /// Existence check honoring expiry; does not count as an access.
    pub async fn has(&self, key: &str) -> bool {
        let (present, expired) = self
            .inner
            .store
            .lock()
            .await
            .has(key, current_timestamp_ms());
        if let Some(removed) = expired {
            self.forget(&[removed]).await;
        }
        present
    }

    // == Clear ==
    /// Empties the cache, resets counters and clears persistence.
    /// Returns how many entries were dropped.
    pub async fn clear(&self) -> usize {
        let count = self.inner.store.lock().await.clear();
        if let Some(persistence) = &self.inner.persistence {
            if let Err(e) = persistence.clear().await {
                warn!("Persistence clear failed: {}", e);
            }
        }
        info!("Cache cleared ({} entries)", count);
        count
    }

    // == Batch Operations ==
    /// Looks up several keys under one lock acquisition. Missing, expired
    /// and undecodable keys are left out of the result.
    pub async fn mget<S: AsRef<str>>(&self, keys: &[S]) -> HashMap<String, Vec<u8>> {
        let now = current_timestamp_ms();
        let mut hits = Vec::new();
        let mut expired = Vec::new();
        {
            let mut store = self.inner.store.lock().await;
            for key in keys {
                match store.get(key.as_ref(), now) {
                    Lookup::Hit(entry) => hits.push((key.as_ref().to_string(), entry)),
                    Lookup::Expired(removed) => expired.push(removed),
                    Lookup::Miss => {}
                }
            }
        }
        self.forget(&expired).await;

        hits.into_iter()
            .filter_map(|(key, entry)| {
                let value = self.decode(&key, &entry).ok()?;
                Some((key, value))
            })
            .collect()
    }

    /// Stores several values with shared options. Returns how many were
    /// stored; failures do not roll back earlier successes.
    pub async fn mset<I, K, V>(&self, items: I, options: &SetOptions) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let mut stored = 0;
        for (key, value) in items {
            let key = key.into();
            match self.set(key.clone(), value, options.clone()).await {
                Ok(()) => stored += 1,
                Err(e) => debug!("mset skipped '{}': {}", key, e),
            }
        }
        stored
    }

    // == Tag Operations ==
    /// Live entries carrying any of `tags`.
    pub async fn get_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> HashMap<String, Vec<u8>> {
        let tagged = self
            .inner
            .store
            .lock()
            .await
            .tagged(tags, current_timestamp_ms());

        tagged
            .into_iter()
            .filter_map(|(key, entry)| {
                let value = self.decode(&key, &entry).ok()?;
                Some((key, value))
            })
            .collect()
    }

    /// Deletes every entry carrying any of `tags`. Returns the count.
    pub async fn delete_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let removed = {
            let mut store = self.inner.store.lock().await;
            let keys = store.keys_with_any_tag(tags);
            remove_keys(&mut store, keys)
        };
        self.forget(&removed).await;
        debug!("Deleted {} entries by tag", removed.len());
        removed.len()
    }

    // == Pattern Invalidation ==
    /// Deletes every key matching a glob (or `re:` regex) pattern.
    ///
    /// A malformed pattern fails with `InvalidPattern` before the store is
    /// touched.
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::parse(pattern)?;
        let removed = {
            let mut store = self.inner.store.lock().await;
            let keys = store.keys_matching(&pattern);
            remove_keys(&mut store, keys)
        };
        self.forget(&removed).await;
        info!(
            "Pattern '{}' invalidated {} entries",
            pattern.as_str(),
            removed.len()
        );
        Ok(removed.len())
    }

    // == Warming ==
    /// Queues values for the warming worker. Nothing is written yet.
    pub fn warm_up(&self, items: impl IntoIterator<Item = WarmItem>) -> usize {
        let count = self.inner.warm_queue.push_all(items);
        debug!("Queued {} items for warming", count);
        count
    }

    pub fn warm_queue_len(&self) -> usize {
        self.inner.warm_queue.len()
    }

    /// Runs one warming tick: writes up to `warm_batch_size` queued items.
    /// Returns how many were stored. Failed items are logged and dropped.
    pub async fn drain_warm_queue(&self) -> usize {
        let batch = self
            .inner
            .warm_queue
            .pop_batch(self.inner.config.warm_batch_size);
        if batch.is_empty() {
            return 0;
        }

        let mut stored = 0;
        for item in batch {
            match self.set(item.key.clone(), item.value, item.options).await {
                Ok(()) => stored += 1,
                Err(e) => warn!("Failed to warm '{}': {}", item.key, e),
            }
        }
        debug!("Warming tick stored {} items", stored);
        stored
    }

    pub fn start_warming(&self) {
        let period = self.inner.config.warm_interval;
        self.inner.warmer.start(period, self.tick_with(|cache| async move {
            cache.drain_warm_queue().await;
        }));
    }

    /// Stops the warming loop; queued items stay for a later start.
    pub async fn stop_warming(&self) {
        self.inner.warmer.stop().await;
    }

    // == Invalidator ==
    pub fn add_invalidation_rule(&self, rule: InvalidationRule) {
        info!("Registered invalidation rule '{}'", rule.name());
        self.inner.rules.write().push(rule);
    }

    /// Removes every rule named `name`; returns whether any existed.
    pub fn remove_invalidation_rule(&self, name: &str) -> bool {
        let mut rules = self.inner.rules.write();
        let before = rules.len();
        rules.retain(|r| r.name() != name);
        rules.len() != before
    }

    pub fn invalidation_rules(&self) -> Vec<String> {
        self.inner
            .rules
            .read()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Evaluates every rule against every entry once and deletes matches.
    /// A rule whose predicate fails is skipped for this pass.
    pub async fn run_invalidation(&self) -> usize {
        let rules: Vec<InvalidationRule> = self.inner.rules.read().clone();
        let mut total = 0;

        for rule in rules {
            let removed = {
                let mut store = self.inner.store.lock().await;
                let mut failure = None;
                let keys = store.keys_where(|key, meta| match rule.matches(key, meta) {
                    Ok(matched) => matched,
                    Err(e) => {
                        failure.get_or_insert(e);
                        false
                    }
                });
                if let Some(e) = failure {
                    warn!("Invalidation rule '{}' failed: {}", rule.name(), e);
                    continue;
                }
                remove_keys(&mut store, keys)
            };

            if !removed.is_empty() {
                debug!(
                    "Rule '{}' invalidated {} entries",
                    rule.name(),
                    removed.len()
                );
            }
            total += removed.len();
            self.forget(&removed).await;
        }
        total
    }

    pub fn start_invalidator(&self) {
        let period = self.inner.config.invalidation_interval;
        self.inner.invalidator.start(period, self.tick_with(|cache| async move {
            cache.run_invalidation().await;
        }));
    }

    pub async fn stop_invalidator(&self) {
        self.inner.invalidator.stop().await;
    }

    // == Expiry Sweep ==
    /// Removes every expired entry. Expired keys are collected under one
    /// lock acquisition, then each is removed under its own, re-checking
    /// expiry so a concurrent overwrite survives.
    pub async fn run_expiry_sweep(&self) -> usize {
        let now = current_timestamp_ms();
        let keys = self.inner.store.lock().await.expired_keys(now);
        if keys.is_empty() {
            debug!("TTL sweep: no expired entries found");
            return 0;
        }

        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            let gone = self.inner.store.lock().await.remove_if_expired(&key, now);
            removed.extend(gone);
        }

        let freed: usize = removed.iter().map(|r| r.entry.size()).sum();
        info!(
            "TTL sweep: removed {} expired entries ({} bytes)",
            removed.len(),
            freed
        );
        self.forget(&removed).await;
        removed.len()
    }

    pub fn start_expiry_sweep(&self) {
        let period = self.inner.config.sweep_interval;
        self.inner.sweeper.start(period, self.tick_with(|cache| async move {
            cache.run_expiry_sweep().await;
        }));
    }

    pub async fn stop_expiry_sweep(&self) {
        self.inner.sweeper.stop().await;
    }

    /// Starts the sweep, warming and invalidator loops.
    pub fn start_background(&self) {
        self.start_expiry_sweep();
        self.start_warming();
        self.start_invalidator();
    }

    /// Stops all loops, letting in-flight ticks finish.
    pub async fn stop_background(&self) {
        self.stop_expiry_sweep().await;
        self.stop_warming().await;
        self.stop_invalidator().await;
    }

    pub fn is_running(&self) -> bool {
        self.inner.sweeper.is_running()
            || self.inner.warmer.is_running()
            || self.inner.invalidator.is_running()
    }

    /// Wraps a per-tick action so the worker holds only a weak reference;
    /// the loop ends once every `Cache` handle is dropped.
    fn tick_with<F, Fut>(
        &self,
        action: F,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send>>
           + Send
           + 'static
    where
        F: Fn(Cache) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let action = Arc::new(action);
        move || {
            let weak = weak.clone();
            let action = action.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(inner) => {
                        action(Cache { inner }).await;
                        true
                    }
                    None => false,
                }
            })
        }
    }

    // == Stats / Maintenance ==
    pub async fn stats(&self) -> StatsSnapshot {
        self.inner.store.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.store.lock().await.is_empty()
    }

    /// Purges expired entries and, above 90% utilization, evicts down to
    /// 75% of `max_size`.
    pub async fn optimize(&self) -> OptimizeReport {
        let (report, removed) = self.inner.store.lock().await.optimize(
            current_timestamp_ms(),
            OPTIMIZE_HIGH_WATER,
            OPTIMIZE_TARGET,
        );
        self.forget(&removed).await;
        info!(
            "Optimize: {} expired, {} evicted, {} bytes freed",
            report.expired_removed, report.evicted, report.bytes_freed
        );
        report
    }

    /// Stops every worker, drops queued warm items and rules, and empties
    /// memory. The persisted snapshot is kept for a future restore.
    pub async fn destroy(&self) {
        self.stop_background().await;
        self.inner.warm_queue.clear();
        self.inner.rules.write().clear();
        let count = self.inner.store.lock().await.clear();
        info!("Cache destroyed ({} entries dropped)", count);
    }

    // == Persistence ==
    /// Loads the persisted snapshot. Expired records are skipped and
    /// deleted from the backend.
    async fn restore(&self) -> usize {
        let Some(persistence) = &self.inner.persistence else {
            return 0;
        };

        let mut records = match persistence.load_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load persisted entries: {}", e);
                return 0;
            }
        };
        records.sort_by_key(|r| r.metadata.created_at);

        let now = current_timestamp_ms();
        let mut restored = 0;
        let mut stale = Vec::new();
        {
            let mut store = self.inner.store.lock().await;
            for record in records {
                if record.metadata.is_expired_at(now) {
                    stale.push(record.key);
                    continue;
                }
                if record.metadata.encrypted && !self.inner.pipeline.can_encrypt() {
                    warn!("Skipping encrypted record '{}': no cipher configured", record.key);
                    continue;
                }

                let mut metadata = record.metadata;
                metadata.persist = true;
                metadata.size = estimate_size(&record.key, &record.value);
                let entry = StoredEntry {
                    value: record.value,
                    metadata,
                };
                match store.restore(record.key.clone(), entry) {
                    Ok(outcome) => {
                        restored += 1;
                        stale.extend(outcome.evicted.into_iter().map(|r| r.key));
                    }
                    Err(e) => {
                        warn!("Failed to restore '{}': {}", record.key, e);
                        stale.push(record.key);
                    }
                }
            }
        }

        for key in stale {
            self.persist_delete(&key).await;
        }
        info!("Restored {} entries from persistence", restored);
        restored
    }

    async fn persist_save(&self, record: PersistedRecord) {
        if let Some(persistence) = &self.inner.persistence {
            let key = record.key.clone();
            if let Err(e) = persistence.save(record).await {
                warn!("Persistence save failed for '{}': {}", key, e);
            }
        }
    }

    async fn persist_delete(&self, key: &str) {
        if let Some(persistence) = &self.inner.persistence {
            if let Err(e) = persistence.delete(key).await {
                warn!("Persistence delete failed for '{}': {}", key, e);
            }
        }
    }

    /// Rewrites the record of `key` from the live entry when it is no longer
    /// the write stamped `generation`.
    async fn resync_persisted(&self, key: &str, generation: u64) {
        let live = {
            let store = self.inner.store.lock().await;
            if store.generation(key) == Some(generation) {
                return;
            }
            store
                .peek(key)
                .filter(|entry| entry.metadata.persist)
                .map(|entry| PersistedRecord {
                    key: key.to_string(),
                    value: entry.value.clone(),
                    metadata: entry.metadata.clone(),
                })
        };

        debug!("'{}' changed while its record was written, re-syncing", key);
        match live {
            Some(record) => self.persist_save(record).await,
            None => self.persist_delete(key).await,
        }
    }

    /// Forwards removals of persisted entries to the backend.
    async fn forget(&self, removed: &[RemovedEntry]) {
        for entry in removed.iter().filter(|r| r.persisted()) {
            self.persist_delete(&entry.key).await;
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn remove_keys(store: &mut CacheStore, keys: Vec<String>) -> Vec<RemovedEntry> {
    keys.into_iter()
        .filter_map(|key| {
            let entry = store.remove(&key)?;
            Some(RemovedEntry { key, entry })
        })
        .collect()
}
