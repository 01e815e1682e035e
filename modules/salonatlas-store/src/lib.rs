//! Object cache client: a thin typed wrapper over a key/value blob store
//! with slash-separated path keys. No business logic lives here — the
//! pipeline must not assume any particular storage technology, only
//! get/put/exists/list by key.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key {0:?}")]
    InvalidKey(String),

    #[error("Serialization error at {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Keys are relative slash-separated paths; the key space is partitioned by
/// salon, so no two salons ever share a key and no locking is needed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Last-write-wins; implementations must not expose partial writes.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// All keys under a prefix, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Typed JSON convenience layer over any [`ObjectStore`].
#[async_trait]
pub trait ObjectStoreExt: ObjectStore {
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Json {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.put(key, &bytes).await
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

/// Reject keys that could escape the store root or alias each other.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && !key.starts_with('/')
        && !key.ends_with('/')
        && !key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
