use crate::ledger::Aggregate;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Search pages to enumerate complexes from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_search_urls")]
    pub search_urls: Vec<String>,

    #[serde(default = "default_lease_suffix")]
    pub lease_suffix: String,

    #[serde(default = "default_results_timeout_secs")]
    pub results_timeout_secs: u64,
}

/// Browser sessions and widget waits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    #[serde(default = "default_frame_name")]
    pub frame_name: String,

    #[serde(default = "default_widget_timeout_secs")]
    pub load_timeout_secs: u64,

    #[serde(default = "default_widget_timeout_secs")]
    pub step_timeout_secs: u64,
}

/// Fetch fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,

    /// Directory for a JSON copy of each run's scraped rows
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

/// Historical ledger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub aggregate: Aggregate,
}

/// Run summary delivery
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NotifyConfig {
    /// Only report these complexes; empty reports all
    #[serde(default)]
    pub complexes: Vec<String>,

    /// Link to the shared ledger appended to the summary
    #[serde(default)]
    pub ledger_link: Option<String>,

    /// Write the summary to this file instead of stdout
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_search_urls() -> Vec<String> {
    [
        "https://prometheusapartments.com/search/?term=San+Francisco+Bay+Area",
        "https://prometheusapartments.com/search/?term=Portland",
        "https://prometheusapartments.com/search/?term=Seattle",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_lease_suffix() -> String {
    "lease/".to_string()
}
fn default_results_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_window_width() -> u32 {
    1920
}
fn default_window_height() -> u32 {
    1200
}
fn default_frame_name() -> String {
    "rp-leasing-widget".to_string()
}
fn default_widget_timeout_secs() -> u64 {
    60
}
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_listing_timeout_secs() -> u64 {
    300
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger.csv")
}
fn default_cron() -> String {
    "0 0 * * * *".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_urls: default_search_urls(),
            lease_suffix: default_lease_suffix(),
            results_timeout_secs: default_results_timeout_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            frame_name: default_frame_name(),
            load_timeout_secs: default_widget_timeout_secs(),
            step_timeout_secs: default_widget_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            listing_timeout_secs: default_listing_timeout_secs(),
            snapshot_dir: None,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            aggregate: Aggregate::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { cron: default_cron() }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load `default.toml` and `local.toml` from `dir`, then `LEASE_SCOUT__*` overrides
    pub fn load(dir: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name(&dir.join("default").to_string_lossy())
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name(&dir.join("local").to_string_lossy())
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("LEASE_SCOUT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("discovery.search_urls")
                    .with_list_parse_key("notify.complexes")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
