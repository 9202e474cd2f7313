mod config;
mod error;
mod ledger;
mod models;
mod pipeline;
mod report;
mod scheduler;
mod scrapers;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "lease-scout", about = "Apartment floorplan availability tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding default.toml / local.toml
    #[arg(long, default_value = "config", global = true, env = "LEASE_SCOUT_CONFIG_DIR")]
    config_dir: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every complex once, update the ledger and print the summary
    Run,

    /// Run on a cron schedule until interrupted
    Schedule {
        /// Cron expression, overrides schedule.cron from the config
        #[arg(long)]
        cron: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "lease_scout=info,warn",
        1 => "lease_scout=debug,info",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(env_filter)
        .init();

    let config = AppConfig::load(&cli.config_dir)?;

    info!("🏠 Lease Scout");

    match cli.command {
        Command::Run => {
            let _t = utils::Timer::start("Availability run");
            let stats = Pipeline::new(config).run().await?;
            info!(
                "Done: {} complexes, {} rows, {} without rows, ledger {} rows",
                stats.listings, stats.rows, stats.empty_listings, stats.ledger_rows
            );
        }

        Command::Schedule { cron } => {
            let cron = cron.unwrap_or_else(|| config.schedule.cron.clone());
            scheduler::run_scheduled(Pipeline::new(config), &cron).await?;
        }
    }

    Ok(())
}
