use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use places_client::{PlacesClient, PlacesError};
use salonatlas_common::{AtlasError, CacheKeys, RawData, SalonRef};
use salonatlas_store::{ObjectStore, ObjectStoreExt};
use tracing::{info, warn};

pub const PROVIDER_ID: &str = "google-places";

// --- PlaceDirectory trait ---

#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    /// Full provider payload for a place id, as stored-verbatim JSON.
    async fn details(&self, place_id: &str) -> Result<serde_json::Value, PlacesError>;

    /// Unit cost of one live `details` call, USD.
    fn unit_cost_usd(&self) -> f64;
}

#[async_trait]
impl PlaceDirectory for PlacesClient {
    async fn details(&self, place_id: &str) -> Result<serde_json::Value, PlacesError> {
        let details = self.place_details(place_id).await?;
        serde_json::to_value(details).map_err(PlacesError::from)
    }

    fn unit_cost_usd(&self) -> f64 {
        places_client::DETAILS_COST_USD
    }
}

// --- Raw fetcher ---

/// Raw data with what the fetch cost: 0.0 for a cache hit, the provider's
/// unit cost for a live call.
#[derive(Debug)]
pub struct Fetched {
    pub raw: RawData,
    pub cost_usd: f64,
}

/// Cache-first provider fetch with write-through. Raw data is immutable
/// once written; a live call happens only on a miss or under `force`.
pub struct RawFetcher {
    store: Arc<dyn ObjectStore>,
    directory: Arc<dyn PlaceDirectory>,
    keys: CacheKeys,
}

impl RawFetcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        directory: Arc<dyn PlaceDirectory>,
        keys: CacheKeys,
    ) -> Self {
        Self {
            store,
            directory,
            keys,
        }
    }

    pub async fn fetch(&self, salon: &SalonRef, force: bool) -> Result<Fetched, AtlasError> {
        let key = self.keys.raw_key(salon);

        if !force {
            let cached: Option<RawData> = self
                .store
                .get_json(&key)
                .await
                .map_err(|e| AtlasError::Store(e.to_string()))?;
            if let Some(raw) = cached {
                info!(key = key.as_str(), "Raw cache hit");
                return Ok(Fetched { raw, cost_usd: 0.0 });
            }
        }

        let place_id = salon.place_id.as_deref().ok_or_else(|| AtlasError::RawFetch {
            key: salon.dedup_key(),
            reason: "no place id".to_string(),
        })?;

        let payload = self
            .directory
            .details(place_id)
            .await
            .map_err(|e| AtlasError::RawFetch {
                key: salon.dedup_key(),
                reason: e.to_string(),
            })?;

        let raw = RawData {
            fetched_at: Utc::now(),
            provider_id: PROVIDER_ID.to_string(),
            payload,
        };

        // Write-through. A failed cache write costs a refetch later but the
        // payload in hand is still good, so the salon proceeds.
        if let Err(e) = self.store.put_json(&key, &raw).await {
            warn!(key = key.as_str(), error = %e, "Raw cache write failed");
        } else {
            info!(key = key.as_str(), "Raw data fetched and cached");
        }

        Ok(Fetched {
            raw,
            cost_usd: self.directory.unit_cost_usd(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use salonatlas_store::MemoryStore;

    struct FakeDirectory {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeDirectory {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl PlaceDirectory for FakeDirectory {
        async fn details(&self, place_id: &str) -> Result<serde_json::Value, PlacesError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PlacesError::Api {
                    status: 500,
                    message: "backend error".into(),
                });
            }
            Ok(serde_json::json!({"id": place_id, "rating": 4.5}))
        }

        fn unit_cost_usd(&self) -> f64 {
            0.017
        }
    }

    fn salon() -> SalonRef {
        SalonRef {
            name: "Shear Bliss".into(),
            region: "Ontario".into(),
            subregion: "Toronto".into(),
            place_id: Some("p-a".into()),
        }
    }

    #[tokio::test]
    async fn miss_calls_provider_and_writes_through() {
        let store = Arc::new(MemoryStore::new());
        let directory = FakeDirectory::new(false);
        let keys = CacheKeys::new("ns");
        let fetcher = RawFetcher::new(store.clone(), directory.clone(), keys.clone());

        let fetched = fetcher.fetch(&salon(), false).await.unwrap();
        assert_eq!(fetched.cost_usd, 0.017);
        assert_eq!(fetched.raw.provider_id, PROVIDER_ID);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        let cached: RawData = store
            .get_json(&keys.raw_key(&salon()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.payload["id"], "p-a");
    }

    #[tokio::test]
    async fn hit_skips_provider_and_costs_nothing() {
        let store = Arc::new(MemoryStore::new());
        let directory = FakeDirectory::new(false);
        let keys = CacheKeys::new("ns");
        let fetcher = RawFetcher::new(store.clone(), directory.clone(), keys);

        fetcher.fetch(&salon(), false).await.unwrap();
        let second = fetcher.fetch(&salon(), false).await.unwrap();

        assert_eq!(second.cost_usd, 0.0);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refetches_over_a_warm_cache() {
        let store = Arc::new(MemoryStore::new());
        let directory = FakeDirectory::new(false);
        let fetcher = RawFetcher::new(store, directory.clone(), CacheKeys::new("ns"));

        fetcher.fetch(&salon(), false).await.unwrap();
        let forced = fetcher.fetch(&salon(), true).await.unwrap();

        assert_eq!(forced.cost_usd, 0.017);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn provider_failure_maps_to_raw_fetch_error() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = RawFetcher::new(store, FakeDirectory::new(true), CacheKeys::new("ns"));

        let err = fetcher.fetch(&salon(), false).await.unwrap_err();
        assert!(matches!(err, AtlasError::RawFetch { .. }));
    }
}
