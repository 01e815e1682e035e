use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{validate_key, ObjectStore, Result, StoreError};

/// Filesystem-backed object store. Writes go to a temp file in the target
/// directory and are renamed into place, so readers never observe a
/// partially-written value.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut key = String::new();
        for seg in rel.components() {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(seg.as_os_str().to_str()?);
        }
        Some(key)
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectStoreExt;

    #[tokio::test]
    async fn round_trip_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        assert!(store.get("ns/raw/a.json").await.unwrap().is_none());
        assert!(!store.exists("ns/raw/a.json").await.unwrap());

        store.put("ns/raw/a.json", b"{\"x\":1}").await.unwrap();
        assert!(store.exists("ns/raw/a.json").await.unwrap());
        assert_eq!(
            store.get("ns/raw/a.json").await.unwrap().unwrap(),
            b"{\"x\":1}"
        );
    }

    #[tokio::test]
    async fn overwrite_is_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.put("k.json", b"first").await.unwrap();
        store.put("k.json", b"second").await.unwrap();
        assert_eq!(store.get("k.json").await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.put("ns/raw/on/b.json", b"1").await.unwrap();
        store.put("ns/raw/on/a.json", b"1").await.unwrap();
        store.put("ns/enriched/on/a.json", b"1").await.unwrap();

        let keys = store.list("ns/raw/").await.unwrap();
        assert_eq!(keys, vec!["ns/raw/on/a.json", "ns/raw/on/b.json"]);

        let all = store.list("ns/").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn typed_json_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store
            .put_json("doc.json", &serde_json::json!({"a": 1}))
            .await
            .unwrap();
        let back: serde_json::Value = store.get_json("doc.json").await.unwrap().unwrap();
        assert_eq!(back["a"], 1);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(store.put("../escape.json", b"x").await.is_err());
        assert!(store.get("/abs.json").await.is_err());
    }
}
