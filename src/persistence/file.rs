//! JSON snapshot file backend.
//!
//! The whole snapshot lives in one file. Every mutation rewrites it through
//! a temporary file and a rename so a crash never leaves a torn snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{PersistedRecord, PersistenceAdapter};
use crate::error::{CacheError, Result};

#[derive(Debug)]
pub struct FilePersistence {
    path: PathBuf,
    records: Mutex<BTreeMap<String, PersistedRecord>>,
}

impl FilePersistence {
    /// Opens (or prepares to create) the snapshot at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => {
                let list: Vec<PersistedRecord> = serde_json::from_slice(&bytes).map_err(|e| {
                    CacheError::Persistence(format!("corrupt snapshot {}: {}", path.display(), e))
                })?;
                list.into_iter().map(|r| (r.key.clone(), r)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened snapshot file {} with {} records",
            path.display(),
            records.len()
        );
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, records: &BTreeMap<String, PersistedRecord>) -> Result<()> {
        let list: Vec<&PersistedRecord> = records.values().collect();
        let bytes = serde_json::to_vec(&list)
            .map_err(|e| CacheError::Persistence(format!("snapshot encode failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Flushed {} records to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for FilePersistence {
    async fn save(&self, record: PersistedRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert(record.key.clone(), record);
        self.flush(&records).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.remove(key).is_some() {
            self.flush(&records).await?;
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PersistedRecord>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut records = self.records.lock().await;
        records.clear();
        self.flush(&records).await
    }
}
