//! In-memory persistence backend.
//!
//! Keeps records in a map. Useful as a fake in tests; `set_failing(true)`
//! makes every call return an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PersistedRecord, PersistenceAdapter};
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: Mutex<HashMap<String, PersistedRecord>>,
    failing: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the backend with records, as if written by an earlier run.
    pub fn with_records(records: impl IntoIterator<Item = PersistedRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.key.clone(), r)).collect();
        Self {
            records: Mutex::new(map),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Persistence("backend unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn save(&self, record: PersistedRecord) -> Result<()> {
        self.check()?;
        self.records.lock().insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.records.lock().remove(key);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedRecord>> {
        self.check()?;
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        self.records.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Metadata, SetOptions};
    use std::time::Duration;

    fn record(key: &str) -> PersistedRecord {
        PersistedRecord {
            key: key.to_string(),
            value: b"v".to_vec(),
            metadata: Metadata::new(&SetOptions::new(), Duration::ZERO, 2, 0),
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let backend = MemoryPersistence::new();
        backend.save(record("a")).await.unwrap();
        backend.save(record("b")).await.unwrap();
        backend.delete("a").await.unwrap();

        let loaded = backend.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "b");
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MemoryPersistence::with_records([record("a")]);
        backend.set_failing(true);

        assert!(backend.save(record("b")).await.is_err());
        assert!(backend.load_all().await.is_err());
        assert!(backend.clear().await.is_err());

        backend.set_failing(false);
        assert_eq!(backend.len(), 1);
    }
}
