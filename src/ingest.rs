//! Ingestion sessions.
//!
//! Two flows share the crawler:
//!
//! - **episodes**: crawl an episode list, normalize every item into an
//!   [`Episode`] of the given show, write the batch in one transaction.
//! - **series**: crawl a show list, resolve each item's identifier through
//!   the [`MetadataProvider`] one at a time with a fixed pause after every
//!   call, merge into [`Series`] records and upsert them one by one.
//!
//! Per-item skips and lookup failures are logged and counted. Only a
//! storage failure ends a session early; rerunning it is safe because every
//! write is an upsert on the natural key.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use episode_browser_core::error::{IngestError, Outcome, SkipReason};
use episode_browser_core::models::{Episode, RawItem, Series};
use episode_browser_core::normalize::{normalize_episode, normalize_series};
use episode_browser_core::store::Store;

use crate::config::Config;
use crate::crawler::{load_all, CrawlReport, CrawlSettings, SelectorSet, SnapshotSource};
use crate::db;
use crate::progress::{ProgressMode, SyncProgressEvent, SyncProgressReporter};
use crate::provider::{HttpMetadataProvider, MetadataProvider};
use crate::snapshot::HtmlSnapshotSource;
use crate::sqlite_store::SqliteStore;

/// Counters for one sync session, printed when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub target: String,
    pub fetched: usize,
    pub skipped: usize,
    pub upserted: usize,
    pub lookup_failures: usize,
    pub iterations: u32,
    pub timed_out: bool,
    pub dry_run: bool,
}

impl SyncSummary {
    fn from_crawl(target: &str, report: &CrawlReport, dry_run: bool) -> Self {
        Self {
            target: target.to_string(),
            fetched: report.items.len(),
            skipped: report.skipped,
            iterations: report.iterations,
            timed_out: report.timed_out,
            dry_run,
            ..Default::default()
        }
    }

    pub fn print(&self) {
        if self.dry_run {
            println!("sync {} (dry-run)", self.target);
        } else {
            println!("sync {}", self.target);
        }
        println!("  fetched: {} items", self.fetched);
        println!("  skipped: {}", self.skipped);
        if self.dry_run {
            println!("  would upsert: {}", self.upserted);
        } else {
            println!("  upserted: {}", self.upserted);
        }
        println!("  lookup failures: {}", self.lookup_failures);
        println!("  scroll iterations: {}", self.iterations);
        if self.timed_out {
            println!("  page did not stabilize; partial content used");
        }
        println!("ok");
    }
}

/// Normalize raw episode items, logging and counting skips.
pub fn normalize_episodes(show: &str, items: &[RawItem]) -> (Vec<Episode>, usize) {
    let mut episodes = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        match normalize_episode(show, item) {
            Outcome::Ok(ep) => episodes.push(ep),
            Outcome::Skip(reason) => {
                skipped += 1;
                warn!(show, title = %item.title, %reason, "skipping episode");
            }
        }
    }
    (episodes, skipped)
}

/// Write an episode batch atomically.
pub async fn store_episodes(
    store: &dyn Store,
    episodes: &[Episode],
) -> Result<usize, IngestError> {
    store
        .upsert_episodes(episodes)
        .await
        .map_err(IngestError::Storage)
}

/// Series records resolved from one crawl.
#[derive(Debug, Clone, Default)]
pub struct SeriesBatch {
    pub series: Vec<Series>,
    pub skipped: usize,
    pub lookup_failures: usize,
}

/// Resolve every item through the provider, strictly in order.
///
/// `delay` is slept after every call, failed ones included.
pub async fn resolve_series(
    provider: &dyn MetadataProvider,
    items: &[RawItem],
    delay: Duration,
    cast_limit: usize,
    progress: &dyn SyncProgressReporter,
) -> SeriesBatch {
    let mut batch = SeriesBatch::default();
    let total = items.len() as u64;

    for (i, item) in items.iter().enumerate() {
        progress.report(SyncProgressEvent::looking_up("series", i as u64 + 1, total));

        let Some(id) = item.link_id.as_deref() else {
            batch.skipped += 1;
            warn!(title = %item.title, reason = %SkipReason::MissingIdentifier, "skipping series");
            continue;
        };

        let looked_up = provider.lookup(id).await;
        match looked_up {
            Ok(meta) => match normalize_series(item, &meta, cast_limit) {
                Outcome::Ok(series) => {
                    info!(id, title = %series.title, "fetched metadata");
                    batch.series.push(series);
                }
                Outcome::Skip(reason) => {
                    batch.skipped += 1;
                    warn!(id, %reason, "skipping series");
                }
            },
            Err(err) => {
                batch.lookup_failures += 1;
                warn!(title = %item.title, "{}", err);
            }
        }

        tokio::time::sleep(delay).await;
    }

    batch
}

/// Upsert series one record at a time.
pub async fn store_series(
    store: &dyn Store,
    series: &[Series],
    progress: &dyn SyncProgressReporter,
) -> Result<usize, IngestError> {
    let total = series.len() as u64;
    for (i, s) in series.iter().enumerate() {
        store
            .upsert_series(s)
            .await
            .map_err(|e| IngestError::Storage(e.context(format!("series '{}'", s.title))))?;
        progress.report(SyncProgressEvent::storing("series", i as u64 + 1, total));
    }
    Ok(series.len())
}

/// Crawl an episode list and store its episodes under `show`.
pub async fn sync_episodes(
    config: &Config,
    source: &dyn SnapshotSource,
    store: &dyn Store,
    show: &str,
    url: &str,
    dry_run: bool,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncSummary> {
    let target = format!("episodes:{}", show);
    let selectors = SelectorSet::compile(&config.crawler.episodes)?;
    progress.report(SyncProgressEvent::crawling(&target));
    let report = load_all(
        source,
        url,
        &selectors,
        CrawlSettings::from_config(&config.crawler),
    )
    .await?;

    let mut summary = SyncSummary::from_crawl(&target, &report, dry_run);
    let (episodes, skipped) = normalize_episodes(show, &report.items);
    summary.skipped += skipped;

    if dry_run {
        summary.upserted = episodes.len();
        return Ok(summary);
    }

    summary.upserted = store_episodes(store, &episodes).await?;
    progress.report(SyncProgressEvent::storing(
        &target,
        summary.upserted as u64,
        episodes.len() as u64,
    ));
    Ok(summary)
}

/// Crawl a show list, resolve metadata and store the series.
///
/// With `json_out`, the resolved records are also written there as a
/// pretty-printed JSON array.
#[allow(clippy::too_many_arguments)]
pub async fn sync_series(
    config: &Config,
    source: &dyn SnapshotSource,
    provider: &dyn MetadataProvider,
    store: &dyn Store,
    url: &str,
    dry_run: bool,
    json_out: Option<&Path>,
    progress: &dyn SyncProgressReporter,
) -> Result<SyncSummary> {
    let selectors = SelectorSet::compile(&config.crawler.series)?;
    progress.report(SyncProgressEvent::crawling("series"));
    let report = load_all(
        source,
        url,
        &selectors,
        CrawlSettings::from_config(&config.crawler),
    )
    .await?;

    let mut summary = SyncSummary::from_crawl("series", &report, dry_run);
    let batch = resolve_series(
        provider,
        &report.items,
        config.provider.delay(),
        config.provider.cast_limit,
        progress,
    )
    .await;
    summary.skipped += batch.skipped;
    summary.lookup_failures = batch.lookup_failures;

    if let Some(path) = json_out {
        let json = serde_json::to_string_pretty(&batch.series)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if dry_run {
        summary.upserted = batch.series.len();
        return Ok(summary);
    }

    summary.upserted = store_series(store, &batch.series, progress).await?;
    Ok(summary)
}

pub async fn run_sync_episodes(
    config: &Config,
    show: &str,
    url: &str,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let source = HtmlSnapshotSource::new(&config.crawler)?;
    let reporter = progress.reporter();

    let summary = sync_episodes(
        config,
        &source,
        &store,
        show,
        url,
        dry_run,
        reporter.as_ref(),
    )
    .await;
    pool.close().await;

    summary?.print();
    Ok(())
}

pub async fn run_sync_series(
    config: &Config,
    url: &str,
    dry_run: bool,
    json_out: Option<&Path>,
    progress: ProgressMode,
) -> Result<()> {
    let Some(base_url) = config.provider.base_url.as_deref() else {
        bail!("provider.base_url must be set to sync series");
    };

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let source = HtmlSnapshotSource::new(&config.crawler)?;
    let provider = HttpMetadataProvider::new(base_url, &config.provider, &config.crawler)?;
    let reporter = progress.reporter();

    let summary = sync_series(
        config,
        &source,
        &provider,
        &store,
        url,
        dry_run,
        json_out,
        reporter.as_ref(),
    )
    .await;
    pool.close().await;

    summary?.print();
    Ok(())
}
