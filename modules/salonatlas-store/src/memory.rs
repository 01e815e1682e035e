use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{validate_key, ObjectStore, Result};

/// In-memory object store for tests and dry runs. Cloning shares the
/// underlying map, so one handle can observe another's writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.inner.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.inner
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.inner.read().await.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.put("k.json", b"v").await.unwrap();
        assert_eq!(b.get("k.json").await.unwrap().unwrap(), b"v");
        assert_eq!(b.len().await, 1);
    }

    #[tokio::test]
    async fn list_is_prefix_scoped() {
        let store = MemoryStore::new();
        store.put("ns/raw/a.json", b"1").await.unwrap();
        store.put("ns/enriched/a.json", b"1").await.unwrap();
        let raw = store.list("ns/raw/").await.unwrap();
        assert_eq!(raw, vec!["ns/raw/a.json"]);
    }
}
