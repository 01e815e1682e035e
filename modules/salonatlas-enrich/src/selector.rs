use salonatlas_common::{
    slugify, AtlasError, CacheKeys, ContentTier, EnrichedDoc, ProgressState, QueueDoc, SalonRef,
};
use salonatlas_store::{ObjectStore, ObjectStoreExt};
use tracing::{info, warn};

/// Filters applied when computing the work list.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Only salons whose region slug matches.
    pub region: Option<String>,
    /// Cap on the work list size, applied after the offset.
    pub limit: Option<usize>,
    /// Skip the first N otherwise-eligible entries.
    pub offset: usize,
    /// Ignore completed keys and cached tiers; everything is eligible again.
    pub force: bool,
    /// Restrict to the current failure list (the retry pass).
    pub retry_failed: bool,
}

/// The computed work list, in stable queue order.
#[derive(Debug, Default)]
pub struct Selection {
    pub salons: Vec<SalonRef>,
    /// Dropped for lack of a place id — unenrichable, bookkept as skipped.
    pub skipped_missing_id: u32,
    /// Excluded because the requested tier is already in the enriched cache.
    pub skipped_cached: u32,
}

/// Load the queue document and compute which salons still need work.
///
/// A missing or corrupt queue document aborts the run before any work
/// starts. An empty result is not an error — it means nothing to do.
pub async fn select(
    store: &dyn ObjectStore,
    keys: &CacheKeys,
    queue: &str,
    tier: ContentTier,
    progress: &ProgressState,
    opts: &SelectOptions,
) -> Result<Selection, AtlasError> {
    let queue_key = keys.queue_key(queue);
    let doc: QueueDoc = store
        .get_json(&queue_key)
        .await
        .map_err(|e| AtlasError::QueueUnreadable {
            key: queue_key.clone(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| AtlasError::QueueUnreadable {
            key: queue_key.clone(),
            reason: "document not found".to_string(),
        })?;

    info!(
        queue = queue_key.as_str(),
        candidates = doc.salons.len(),
        "Queue loaded"
    );

    let retry_keys: Vec<&str> = progress
        .failed_salons
        .iter()
        .map(|f| f.key.as_str())
        .collect();

    let mut selection = Selection::default();
    let mut eligible = Vec::new();

    for salon in doc.salons.into_iter().map(SalonRef::from) {
        if let Some(ref region) = opts.region {
            if slugify(&salon.region) != slugify(region) {
                continue;
            }
        }

        if salon.place_id.is_none() {
            warn!(
                salon = salon.name.as_str(),
                location = salon.location().as_str(),
                "No place id, skipping as unenrichable"
            );
            selection.skipped_missing_id += 1;
            continue;
        }

        let key = salon.dedup_key();

        if opts.retry_failed {
            if retry_keys.iter().any(|k| *k == key) {
                eligible.push(salon);
            }
            continue;
        }

        if !opts.force {
            if progress.is_completed(&key) {
                continue;
            }
            // Progress may have been lost or reset; the cache is the
            // second line of defense for at-most-once enrichment.
            let cached: Option<EnrichedDoc> = store
                .get_json(&keys.enriched_key(&salon))
                .await
                .map_err(|e| AtlasError::Store(e.to_string()))?;
            if cached.is_some_and(|doc| doc.has_tier(tier)) {
                selection.skipped_cached += 1;
                continue;
            }
        }

        eligible.push(salon);
    }

    // Stable input order, so resumption with an offset is deterministic.
    let mut work: Vec<SalonRef> = eligible.into_iter().skip(opts.offset).collect();
    if let Some(limit) = opts.limit {
        work.truncate(limit);
    }

    info!(
        selected = work.len(),
        skipped_missing_id = selection.skipped_missing_id,
        skipped_cached = selection.skipped_cached,
        "Selection complete"
    );

    selection.salons = work;
    Ok(selection)
}
