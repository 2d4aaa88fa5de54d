//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies. Values are
//! arbitrary JSON; TTLs are given in seconds.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Priority, SetOptions, MAX_KEY_LENGTH};

/// Per-entry options shared by the write endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryOptions {
    /// Optional TTL in seconds; 0 means no expiry
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Compress when above the threshold (default: true)
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default)]
    pub persist: bool,
}

impl EntryOptions {
    pub fn to_set_options(&self) -> SetOptions {
        let mut options = SetOptions::new()
            .priority(self.priority.unwrap_or_default())
            .tags(self.tags.iter().cloned())
            .compress(self.compress.unwrap_or(true))
            .persist(self.persist);
        if let Some(secs) = self.ttl {
            options = options.ttl(Duration::from_secs(secs));
        }
        options
    }
}

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    #[serde(flatten)]
    pub options: EntryOptions,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// A key/value pair inside a batch write.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

/// Request body for POST /mset; options apply to every item.
#[derive(Debug, Clone, Deserialize)]
pub struct MsetRequest {
    pub items: Vec<KeyValue>,
    #[serde(flatten)]
    pub options: EntryOptions,
}

/// Request body for POST /mget
#[derive(Debug, Clone, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

/// Request body for POST /tags/get and POST /tags/delete
#[derive(Debug, Clone, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

impl TagsRequest {
    pub fn validate(&self) -> Option<String> {
        self.tags
            .is_empty()
            .then(|| "At least one tag is required".to_string())
    }
}

/// Request body for POST /invalidate
///
/// `pattern` is a glob (`*`, `?`, `[...]`) or a `re:`-prefixed regex.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

/// One item of a warm-up request.
#[derive(Debug, Clone, Deserialize)]
pub struct WarmEntry {
    pub key: String,
    pub value: Value,
    #[serde(flatten)]
    pub options: EntryOptions,
}

/// Request body for POST /warm
#[derive(Debug, Clone, Deserialize)]
pub struct WarmRequest {
    pub items: Vec<WarmEntry>,
}

pub(crate) fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
