use std::sync::Arc;

use salonatlas_common::{AtlasError, ProgressState};
use salonatlas_store::{ObjectStore, ObjectStoreExt};
use tracing::warn;

/// Durable progress document access: load, save, and read-merge-write
/// updates. Persistence is a full-document overwrite, so `update` always
/// reloads immediately before mutating — the single-writer assumption makes
/// that sufficient.
pub struct ProgressStore {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: String) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// An absent document is an empty state, not an error.
    pub async fn load(&self) -> Result<ProgressState, AtlasError> {
        Ok(self
            .store
            .get_json(&self.key)
            .await
            .map_err(|e| AtlasError::Store(e.to_string()))?
            .unwrap_or_default())
    }

    pub async fn save(&self, state: &ProgressState) -> Result<(), AtlasError> {
        self.store
            .put_json(&self.key, state)
            .await
            .map_err(|e| AtlasError::Store(e.to_string()))
    }

    /// Read-merge-write. The closure sees the freshly-loaded state and
    /// applies its contribution; counters merge additively because every
    /// contribution goes through here exactly once.
    pub async fn update<F>(&self, f: F) -> Result<ProgressState, AtlasError>
    where
        F: FnOnce(&mut ProgressState),
    {
        let mut state = self.load().await?;
        f(&mut state);
        self.save(&state).await?;
        Ok(state)
    }

    /// Best-effort variant for mid-run persistence: a lost progress write
    /// must not abort the run — in-memory counters still advance and the
    /// next successful save reconciles.
    pub async fn update_best_effort<F>(&self, f: F) -> Option<ProgressState>
    where
        F: FnOnce(&mut ProgressState),
    {
        match self.update(f).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(key = self.key.as_str(), error = %e, "Progress save failed, continuing");
                None
            }
        }
    }
}
