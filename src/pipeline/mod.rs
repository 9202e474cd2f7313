//! Run orchestrator: discovery → fetch → reconcile → persist → notify.
//!
//! The ledger is read before any scraping and written once at the end by this
//! task alone. If it cannot be read the run stops before touching the browser;
//! if nothing is discovered the run stops without rewriting it.

pub mod coordinator;

pub use coordinator::FetchCoordinator;

use crate::config::AppConfig;
use crate::error::ScoutError;
use crate::ledger::{reconcile, CsvLedgerStore, LedgerStore};
use crate::models::ListingResult;
use crate::report::{format_summary, FileNotifier, Notifier, StdoutNotifier};
use crate::scrapers::{AvailabilityExtractor, ChromeDriverFactory, DriverFactory, ExtractorSettings, ListingDiscovery};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
    factory: Arc<dyn DriverFactory>,
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub listings: usize,
    pub rows: usize,
    pub empty_listings: usize,
    pub ledger_rows: usize,
}

impl Pipeline {
    /// Pipeline backed by headless Chrome and the configured ledger file
    pub fn new(config: AppConfig) -> Self {
        let factory: Arc<dyn DriverFactory> = Arc::new(ChromeDriverFactory::new(&config.browser));
        let store: Arc<dyn LedgerStore> = Arc::new(CsvLedgerStore::new(&config.ledger.path));
        let notifier: Arc<dyn Notifier> = match &config.notify.output {
            Some(path) => Arc::new(FileNotifier::new(path)),
            None => Arc::new(StdoutNotifier),
        };
        Self::with_parts(config, factory, store, notifier)
    }

    pub fn with_parts(
        config: AppConfig,
        factory: Arc<dyn DriverFactory>,
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            factory,
            store,
            notifier,
        }
    }

    pub async fn run(&self) -> Result<RunStats> {
        self.run_on(Local::now().date_naive()).await
    }

    /// One full run, stamping today's rows with `date`
    pub async fn run_on(&self, date: NaiveDate) -> Result<RunStats> {
        let existing = self.store.read_all().await?;
        info!(rows = existing.len(), "Loaded ledger baseline");

        let settings = ExtractorSettings::from_config(
            &self.config.browser,
            self.config.discovery.results_timeout_secs,
        );

        // ── 1. Discover complexes ─────────────────────────────────────────────
        let search_urls = self.config.discovery.search_urls.clone();
        let discovery = ListingDiscovery::new(
            Arc::clone(&self.factory),
            settings.clone(),
            &self.config.discovery.lease_suffix,
        );
        let listings = tokio::task::spawn_blocking(move || discovery.discover_all(&search_urls))
            .await
            .context("Discovery task failed")?;

        if listings.is_empty() {
            return Err(ScoutError::Discovery {
                search_pages: self.config.discovery.search_urls.len(),
            }
            .into());
        }
        info!("{} complexes to scrape", listings.len());

        // ── 2. Scrape each complex ────────────────────────────────────────────
        let extractor = Arc::new(AvailabilityExtractor::new(Arc::clone(&self.factory), settings));
        let coordinator = FetchCoordinator::new(
            extractor,
            self.config.pipeline.concurrency,
            Duration::from_secs(self.config.pipeline.listing_timeout_secs),
        );
        let outcome = coordinator.fetch_all(&listings).await;

        if let Some(dir) = &self.config.pipeline.snapshot_dir {
            if let Err(e) = save_snapshot(dir, date, &outcome.result).await {
                warn!("Failed to save snapshot: {:#}", e);
            }
        }

        // ── 3. Reconcile and persist ──────────────────────────────────────────
        let merged = reconcile(existing, &outcome.result, date, self.config.ledger.aggregate);
        self.store.write_all(&merged.ledger).await?;
        info!(
            today = merged.today.len(),
            total = merged.ledger.len(),
            "Ledger updated"
        );

        // ── 4. Notify ─────────────────────────────────────────────────────────
        let summary = format_summary(
            &outcome.result,
            &self.config.notify.complexes,
            self.config.notify.ledger_link.as_deref(),
        );
        if let Err(e) = self.notifier.send(&summary).await {
            warn!("Failed to deliver summary: {:#}", e);
        }

        Ok(RunStats {
            listings: listings.len(),
            rows: outcome.result.values().map(Vec::len).sum(),
            empty_listings: outcome.empty.len(),
            ledger_rows: merged.ledger.len(),
        })
    }
}

/// Save the raw scrape as `<dir>/<date>.json`
async fn save_snapshot(dir: &Path, date: NaiveDate, result: &ListingResult) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", date.format("%Y-%m-%d")));
    let json = serde_json::to_string_pretty(result)?;
    tokio::fs::write(&path, json).await?;
    info!("💾 Saved snapshot to {}", path.display());
    Ok(())
}
