use crate::pipeline::Pipeline;
use anyhow::{bail, Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Reject expressions the scheduler cannot parse before handing them over.
///
/// The scheduler wants a leading seconds field: hourly is `0 0 * * * *`.
pub fn check_cron(cron: &str) -> Result<()> {
    let fields = cron.split_whitespace().count();
    if !(6..=7).contains(&fields) {
        bail!(
            "cron expression {:?} has {} fields; 6 are required with seconds first (e.g. \"0 0 * * * *\" for hourly)",
            cron,
            fields
        );
    }
    Ok(())
}

/// Run `work` unless another run holds `in_flight`. Returns whether it ran.
pub async fn run_exclusive<F>(in_flight: &Mutex<()>, work: F) -> bool
where
    F: Future<Output = ()>,
{
    let Ok(_guard) = in_flight.try_lock() else {
        warn!("Previous run still in progress, skipping this tick");
        return false;
    };
    work.await;
    true
}

/// Wait for an in-flight run, if any, to release `in_flight`
pub async fn drain(in_flight: &Mutex<()>) {
    let _wait = in_flight.lock().await;
}

/// Cron job that triggers one pipeline run per tick, never two at once
pub fn build_job(cron: &str, pipeline: Arc<Pipeline>, in_flight: Arc<Mutex<()>>) -> Result<Job> {
    check_cron(cron)?;

    Job::new_async(cron, move |_uuid, _l| {
        let pipeline = Arc::clone(&pipeline);
        let in_flight = Arc::clone(&in_flight);
        Box::pin(async move {
            run_exclusive(&in_flight, async {
                let _t = crate::utils::Timer::start("Scheduled run");
                match pipeline.run().await {
                    Ok(stats) => info!(
                        "Run done: {} complexes, {} rows, {} empty, ledger {} rows",
                        stats.listings, stats.rows, stats.empty_listings, stats.ledger_rows
                    ),
                    Err(e) => error!("Run failed: {:#}", e),
                }
            })
            .await;
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))
}

/// Trigger a run on every tick of `cron` until interrupted.
///
/// On Ctrl-C no further runs start and an in-flight run is allowed to finish.
pub async fn run_scheduled(pipeline: Pipeline, cron: &str) -> Result<()> {
    let in_flight = Arc::new(Mutex::new(()));
    let job = build_job(cron, Arc::new(pipeline), Arc::clone(&in_flight))?;

    let mut sched = JobScheduler::new().await.context("creating scheduler")?;
    sched.add(job).await.context("adding scheduler job")?;
    sched.start().await.context("starting scheduler")?;
    info!(cron, "Scheduler started, Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Interrupt received, no further runs will start");
    sched.shutdown().await.context("stopping scheduler")?;

    drain(&in_flight).await;
    info!("Scheduler stopped");
    Ok(())
}
