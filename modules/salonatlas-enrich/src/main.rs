use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use places_client::PlacesClient;
use salonatlas_common::{CacheKeys, Config, ContentTier};
use salonatlas_enrich::enricher::{BackoffPolicy, ClaudeCopyModel, Enricher};
use salonatlas_enrich::fetcher::RawFetcher;
use salonatlas_enrich::progress::ProgressStore;
use salonatlas_enrich::scheduler::{BatchRunner, RunOptions, RunOutcome};
use salonatlas_enrich::selector::{self, SelectOptions};
use salonatlas_store::{FsStore, ObjectStore};

/// Batch enrichment pipeline for the salon directory.
#[derive(Parser, Debug)]
#[command(name = "salonatlas-enrich")]
struct Args {
    /// Cap the work list at N salons.
    #[arg(long)]
    limit: Option<usize>,

    /// Skip the first N eligible salons.
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Only process salons in this region.
    #[arg(long)]
    region: Option<String>,

    /// Queue name (selects the queue and progress documents).
    #[arg(long, default_value = "queue")]
    queue: String,

    /// Content tier to generate.
    #[arg(long, default_value = "tier1")]
    tier: ContentTier,

    /// Re-fetch and re-enrich even where the cache already has results.
    #[arg(long)]
    force: bool,

    /// Compute and print the work list without calling any provider.
    #[arg(long)]
    dry_run: bool,

    /// Re-drive only the current failure list through the pipeline.
    #[arg(long)]
    retry_failed: bool,

    /// Ask a running job on this queue to pause at its next batch
    /// boundary, then exit.
    #[arg(long)]
    stop: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("salonatlas=info".parse()?))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    config.log_redacted();

    let store: Arc<dyn ObjectStore> = Arc::new(FsStore::new(config.store_root.clone()));
    let keys = CacheKeys::new(config.namespace.clone());
    let progress = ProgressStore::new(store.clone(), keys.progress_key(&args.queue));

    if args.stop {
        progress
            .update(|s| {
                s.is_running = false;
                s.push_log("stop requested");
            })
            .await?;
        info!(queue = args.queue.as_str(), "Stop requested; the running job will pause at its next batch boundary");
        return Ok(());
    }

    let state = progress.load().await?;
    if state.is_running {
        info!("Progress document says a run is in progress; if that job died, this run supersedes it");
    }

    let select_opts = SelectOptions {
        region: args.region.clone(),
        limit: args.limit,
        offset: args.offset,
        force: args.force,
        retry_failed: args.retry_failed,
    };
    let selection = selector::select(
        store.as_ref(),
        &keys,
        &args.queue,
        args.tier,
        &state,
        &select_opts,
    )
    .await?;

    if args.dry_run {
        println!(
            "Dry run: {} salons would be processed ({} skipped for missing ids, {} already cached)",
            selection.salons.len(),
            selection.skipped_missing_id,
            selection.skipped_cached
        );
        for salon in &selection.salons {
            println!("  {} [{}]", salon.name, salon.location());
        }
        return Ok(());
    }

    let mut credentials = vec![config.anthropic_api_key.clone()];
    if let Some(ref fallback) = config.anthropic_fallback_api_key {
        credentials.push(fallback.clone());
    }

    let fetcher = RawFetcher::new(
        store.clone(),
        Arc::new(PlacesClient::new(config.places_api_key.clone())),
        keys.clone(),
    );
    let enricher = Enricher::new(
        Arc::new(ClaudeCopyModel),
        config.models.clone(),
        credentials,
        BackoffPolicy {
            base: Duration::from_millis(config.backoff_base_ms),
            cap: Duration::from_millis(config.backoff_cap_ms),
            error_delay: Duration::from_millis(config.error_delay_ms),
        },
    );
    let runner = BatchRunner::new(
        store,
        keys,
        fetcher,
        enricher,
        progress,
        RunOptions {
            batch_size: config.batch_size,
            cooldown: Duration::from_secs(config.batch_cooldown_secs),
            salon_timeout: Duration::from_secs(config.salon_timeout_secs),
            tier: args.tier,
            force: args.force,
        },
    );

    let preskipped = selection.skipped_missing_id + selection.skipped_cached;
    let (stats, outcome) = runner.run(selection.salons, preskipped).await?;

    match outcome {
        RunOutcome::Completed => info!("Run complete"),
        RunOutcome::Paused => info!("Run paused by stop request; re-run to resume"),
        RunOutcome::NothingToDo => info!("Nothing to do"),
    }
    println!("{stats}");

    Ok(())
}
