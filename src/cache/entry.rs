//! Cache Entry Module
//!
//! Defines stored entries, their metadata and the options accepted by `set`.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Priority ==
/// Eviction priority of an entry. Lower priorities are evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

// == Set Options ==
/// Per-entry options for `set`, `mset` and warming.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL override; `None` falls back to the configured default
    pub ttl: Option<Duration>,
    pub priority: Priority,
    pub tags: Vec<String>,
    /// Compress when the value is above the compression threshold
    pub compress: bool,
    /// Encrypt through the configured cipher
    pub encrypt: bool,
    /// Forward the entry to the persistence adapter
    pub persist: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

// == Metadata ==
/// Bookkeeping kept alongside every stored value.
///
/// Timestamps are Unix milliseconds. `expires_at` is `None` for entries
/// that never expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub last_accessed: u64,
    pub access_count: u64,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub compressed: bool,
    pub encrypted: bool,
    pub persist: bool,
    /// Estimated footprint in bytes (key plus stored value)
    pub size: usize,
}

impl Metadata {
    // == Constructor ==
    /// Creates metadata for a fresh entry.
    ///
    /// A zero TTL means the entry never expires, and so does a TTL whose
    /// deadline does not fit in a `u64` of milliseconds.
    pub fn new(options: &SetOptions, ttl: Duration, size: usize, now: u64) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            now.checked_add(ttl_ms)
        };

        Self {
            created_at: now,
            expires_at,
            last_accessed: now,
            access_count: 0,
            priority: options.priority,
            tags: options.tags.iter().cloned().collect(),
            compressed: false,
            encrypted: false,
            persist: options.persist,
            size,
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` is strictly past `expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires) if now > expires)
    }

    /// Any-match tag test.
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|t| self.tags.contains(t.as_ref()))
    }

    pub(crate) fn record_access(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count += 1;
    }
}

// == Stored Entry ==
/// A value as it sits in the store, possibly compressed and/or encrypted.
///
/// Value and metadata live in the same struct so they can only be
/// inserted and removed together.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub value: Vec<u8>,
    pub metadata: Metadata,
}

impl StoredEntry {
    pub fn size(&self) -> usize {
        self.metadata.size
    }
}

/// Size estimate used for capacity accounting.
pub fn estimate_size(key: &str, stored: &[u8]) -> usize {
    key.len() + stored.len()
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
