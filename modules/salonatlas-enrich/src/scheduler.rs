use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use salonatlas_common::{
    AtlasError, CacheKeys, ContentTier, EnrichedDoc, SalonRef, TierContent, COST_ENRICHMENT,
    COST_RAW_FETCH,
};
use salonatlas_store::{ObjectStore, ObjectStoreExt};
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

use crate::enricher::Enricher;
use crate::fetcher::RawFetcher;
use crate::progress::ProgressStore;
use crate::stats::RunStats;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Concurrency width: salons processed in parallel within one batch.
    pub batch_size: usize,
    /// Sleep between batches.
    pub cooldown: Duration,
    /// Wall-clock budget per salon. Client-side race only — an expired
    /// salon stops being waited on, but the underlying provider call is
    /// not aborted server-side.
    pub salon_timeout: Duration,
    pub tier: ContentTier,
    pub force: bool,
}

/// How a run ended. Fatal errors (selector, initial progress I/O) surface
/// as `Err` before any batch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Stopped cooperatively via the `isRunning` flag at a batch boundary.
    Paused,
    NothingToDo,
}

enum SalonOutcome {
    Enriched {
        model: String,
        raw_cost: f64,
        enrich_cost: f64,
    },
    AlreadyEnriched,
    Failed {
        error: String,
    },
}

struct SalonReport {
    key: String,
    outcome: SalonOutcome,
}

/// Drives the pipeline: sequential fixed-size batches, parallel salons
/// within a batch, one progress persist per batch, cooldown between
/// batches, cooperative stop at batch boundaries.
pub struct BatchRunner {
    store: Arc<dyn ObjectStore>,
    keys: CacheKeys,
    fetcher: RawFetcher,
    enricher: Enricher,
    progress: ProgressStore,
    opts: RunOptions,
}

impl BatchRunner {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        keys: CacheKeys,
        fetcher: RawFetcher,
        enricher: Enricher,
        progress: ProgressStore,
        opts: RunOptions,
    ) -> Self {
        Self {
            store,
            keys,
            fetcher,
            enricher,
            progress,
            opts,
        }
    }

    /// Process the work list. `preskipped` is the selector's skip count
    /// (missing ids, already-cached tiers), folded into the run's
    /// bookkeeping so the summary reflects the whole queue.
    pub async fn run(
        &self,
        salons: Vec<SalonRef>,
        preskipped: u32,
    ) -> Result<(RunStats, RunOutcome), AtlasError> {
        let started = Instant::now();
        let width = self.opts.batch_size.max(1);
        let mut stats = RunStats {
            skipped: preskipped,
            ..Default::default()
        };

        // The initial progress write is the one that must succeed: losing
        // it would leave no record a run ever started.
        self.progress
            .update(|s| {
                s.is_running = true;
                s.total_salons = salons.len() as u32;
                s.skipped += preskipped;
                s.push_log(format!(
                    "run started: {} salons, batch size {}",
                    salons.len(),
                    width
                ));
            })
            .await?;

        if salons.is_empty() {
            info!("Nothing to do");
            self.progress
                .update_best_effort(|s| {
                    s.is_running = false;
                    s.push_log("nothing to do");
                })
                .await;
            stats.elapsed = started.elapsed();
            return Ok((stats, RunOutcome::NothingToDo));
        }

        let batches: Vec<&[SalonRef]> = salons.chunks(width).collect();
        let total_batches = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            // Cooperative cancellation: re-read the flag at every batch
            // boundary. Salons mid-flight in the current batch finish.
            if index > 0 {
                match self.progress.load().await {
                    Ok(live) if !live.is_running => {
                        info!(batches_done = index, "Stop requested, pausing run");
                        self.progress
                            .update_best_effort(|s| s.push_log("run paused by stop request"))
                            .await;
                        stats.elapsed = started.elapsed();
                        return Ok((stats, RunOutcome::Paused));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Could not re-read running flag, continuing");
                    }
                }
            }

            let location = batch[0].location();
            info!(
                batch = index + 1,
                total_batches,
                salons = batch.len(),
                location = location.as_str(),
                "Starting batch"
            );

            let reports: Vec<SalonReport> = stream::iter(batch.iter().map(|salon| {
                let salon = salon.clone();
                async move {
                    match timeout(self.opts.salon_timeout, self.process_salon(&salon)).await {
                        Ok(report) => report,
                        Err(_) => SalonReport {
                            key: salon.dedup_key(),
                            outcome: SalonOutcome::Failed {
                                error: AtlasError::SalonTimeout {
                                    key: salon.dedup_key(),
                                    seconds: self.opts.salon_timeout.as_secs(),
                                }
                                .to_string(),
                            },
                        },
                    }
                }
            }))
            .buffer_unordered(width)
            .collect()
            .await;

            for report in &reports {
                match &report.outcome {
                    SalonOutcome::Enriched {
                        raw_cost,
                        enrich_cost,
                        ..
                    } => {
                        stats.succeeded += 1;
                        stats.raw_fetch_cost_usd += raw_cost;
                        stats.enrichment_cost_usd += enrich_cost;
                    }
                    SalonOutcome::AlreadyEnriched => stats.skipped += 1,
                    SalonOutcome::Failed { .. } => stats.failed += 1,
                }
            }

            // One persist per batch bounds progress I/O; a lost write is
            // reconciled by the next batch's save.
            self.progress
                .update_best_effort(|s| {
                    s.current_location = Some(location.clone());
                    for report in &reports {
                        match &report.outcome {
                            SalonOutcome::Enriched {
                                model,
                                raw_cost,
                                enrich_cost,
                            } => {
                                s.succeeded += 1;
                                s.record_completed(&report.key);
                                s.cost.record(COST_RAW_FETCH, *raw_cost);
                                s.cost.record(COST_ENRICHMENT, *enrich_cost);
                                s.push_log(format!("enriched {} via {}", report.key, model));
                            }
                            SalonOutcome::AlreadyEnriched => {
                                s.skipped += 1;
                                s.record_completed(&report.key);
                                s.push_log(format!("skipped {}: already enriched", report.key));
                            }
                            SalonOutcome::Failed { error } => {
                                s.failed += 1;
                                s.record_failure(&report.key, error);
                                s.push_log(format!("failed {}: {}", report.key, error));
                            }
                        }
                    }
                })
                .await;

            if index + 1 < total_batches && !self.opts.cooldown.is_zero() {
                sleep(self.opts.cooldown).await;
            }
        }

        self.progress
            .update_best_effort(|s| {
                s.is_running = false;
                s.current_location = None;
                s.push_log(format!(
                    "run complete: {} succeeded, {} failed, {} skipped",
                    stats.succeeded, stats.failed, stats.skipped
                ));
            })
            .await;

        stats.elapsed = started.elapsed();
        Ok((stats, RunOutcome::Completed))
    }

    /// One salon's full pipeline, run as a single unit of work:
    /// skip check → raw fetch → enrichment → enriched-cache write.
    async fn process_salon(&self, salon: &SalonRef) -> SalonReport {
        let key = salon.dedup_key();
        let enriched_key = self.keys.enriched_key(salon);

        let report = |outcome| SalonReport {
            key: key.clone(),
            outcome,
        };

        // At-most-once per (salon, tier): an existing tier short-circuits
        // the whole pipeline unless forced.
        if !self.opts.force {
            match self.store.get_json::<EnrichedDoc>(&enriched_key).await {
                Ok(Some(doc)) if doc.has_tier(self.opts.tier) => {
                    info!(key = key.as_str(), tier = %self.opts.tier, "Already enriched, skipping");
                    return report(SalonOutcome::AlreadyEnriched);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(key = key.as_str(), error = %e, "Enriched-cache check failed, proceeding");
                }
            }
        }

        let fetched = match self.fetcher.fetch(salon, self.opts.force).await {
            Ok(fetched) => fetched,
            Err(e) => {
                return report(SalonOutcome::Failed {
                    error: e.to_string(),
                })
            }
        };

        let generated = match self
            .enricher
            .enrich(salon, &fetched.raw, self.opts.tier)
            .await
        {
            Ok(generated) => generated,
            Err(e) => {
                return report(SalonOutcome::Failed {
                    error: e.to_string(),
                })
            }
        };

        // Read-modify-write so other tiers in the document survive.
        let mut doc: EnrichedDoc = match self.store.get_json(&enriched_key).await {
            Ok(existing) => existing.unwrap_or_default(),
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Enriched doc unreadable, starting fresh");
                EnrichedDoc::default()
            }
        };
        doc.tiers.insert(
            self.opts.tier,
            TierContent {
                enriched_at: chrono::Utc::now(),
                model_used: generated.model.clone(),
                copy: generated.copy,
            },
        );

        // Without the cached write the salon is not done: counting it
        // succeeded would skip it forever with nothing in the cache.
        if let Err(e) = self.store.put_json(&enriched_key, &doc).await {
            warn!(key = enriched_key.as_str(), error = %e, "Enriched cache write failed");
            return report(SalonOutcome::Failed {
                error: format!("enriched cache write failed: {e}"),
            });
        }

        info!(
            key = key.as_str(),
            model = generated.model.as_str(),
            tier = %self.opts.tier,
            "Salon enriched"
        );

        report(SalonOutcome::Enriched {
            model: generated.model,
            raw_cost: fetched.cost_usd,
            enrich_cost: generated.cost_usd,
        })
    }
}
