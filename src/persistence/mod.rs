//! Persistence Module
//!
//! Best-effort snapshot storage behind the [`PersistenceAdapter`] trait.
//! The engine never lets an adapter failure reach its callers.

mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

use crate::cache::Metadata;
use crate::error::Result;

// == Persisted Record ==
/// `{ key, value, metadata }` as written by an adapter.
///
/// `value` is the stored form (already compressed/encrypted), so restoring
/// it does not rerun the transform pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub key: String,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    pub metadata: Metadata,
}

// == Persistence Adapter ==
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn save(&self, record: PersistedRecord) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn load_all(&self) -> Result<Vec<PersistedRecord>>;

    async fn clear(&self) -> Result<()>;
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
