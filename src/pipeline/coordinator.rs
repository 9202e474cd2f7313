use crate::models::{Listing, ListingResult};
use crate::scrapers::AvailabilityExtractor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Result of fanning the extractor out over a set of listings
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub result: ListingResult,
    /// Complexes that came back without rows
    pub empty: Vec<String>,
}

/// Runs the extractor over many listings with bounded parallelism.
///
/// Each listing occupies one permit (and so one browser session) until its
/// extraction has actually returned, even if the coordinator stopped waiting
/// for it after `listing_timeout`.
pub struct FetchCoordinator {
    extractor: Arc<AvailabilityExtractor>,
    concurrency: usize,
    listing_timeout: Duration,
}

impl FetchCoordinator {
    pub fn new(extractor: Arc<AvailabilityExtractor>, concurrency: usize, listing_timeout: Duration) -> Self {
        Self {
            extractor,
            concurrency: concurrency.max(1),
            listing_timeout,
        }
    }

    pub async fn fetch_all(&self, listings: &[Listing]) -> FetchOutcome {
        info!(listings = listings.len(), workers = self.concurrency, "Fetching availability");

        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for listing in listings.iter().cloned() {
            let sem = Arc::clone(&sem);
            let extractor = Arc::clone(&self.extractor);
            let limit = self.listing_timeout;

            tasks.spawn(async move {
                let id = listing.complex_id.clone();
                let Ok(permit) = sem.acquire_owned().await else {
                    return (id, Vec::new());
                };

                let work = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    extractor.extract(&listing)
                });

                let rows = match tokio::time::timeout(limit, work).await {
                    Ok(Ok(rows)) => rows,
                    Ok(Err(e)) => {
                        error!(complex = %id, "Extractor task panicked: {}", e);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(complex = %id, "No result within {:?}, recording no rows", limit);
                        Vec::new()
                    }
                };
                (id, rows)
            });
        }

        let mut outcome = FetchOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, rows)) => {
                    if rows.is_empty() {
                        outcome.empty.push(id.clone());
                    }
                    outcome.result.insert(id, rows);
                }
                Err(e) => error!("Fetch task failed: {}", e),
            }
        }
        outcome.empty.sort();

        info!(
            complexes = outcome.result.len(),
            empty = outcome.empty.len(),
            rows = outcome.result.values().map(Vec::len).sum::<usize>(),
            "Fetch finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fake::{FakeFactory, FakeScript};
    use crate::scrapers::ExtractorSettings;
    use std::collections::HashMap;

    fn url(id: &str) -> String {
        format!("https://example.com/apartments/{}/lease/", id)
    }

    fn widget(plans: &[&str], latency: Duration) -> FakeScript {
        let sel = ExtractorSettings::default().selectors;
        let tiles: String = plans
            .iter()
            .map(|p| {
                format!(
                    r#"<div class="floorplan-tile"><div><span class="name">{}</span><span class="specs">1 Bed</span><span class="range">$1,000 - $1,200</span></div><div class="tile-buttons"><button>(2) Apply</button></div></div>"#,
                    p
                )
            })
            .collect();
        FakeScript::default()
            .with(&sel.widget_frame, &[""])
            .with(&sel.start_button, &["Start"])
            .with(&sel.unit_type_link, &["All"])
            .with(&sel.floorplan_tile, &[""])
            .content(tiles)
            .latency(latency)
    }

    fn listings(ids: &[&str]) -> Vec<Listing> {
        ids.iter()
            .map(|id| Listing {
                complex_id: id.to_string(),
                url: url(id),
            })
            .collect()
    }

    fn coordinator(factory: &FakeFactory, workers: usize, timeout: Duration) -> FetchCoordinator {
        let extractor = AvailabilityExtractor::new(Arc::new(factory.clone()), ExtractorSettings::default());
        FetchCoordinator::new(Arc::new(extractor), workers, timeout)
    }

    #[tokio::test]
    async fn test_failed_listing_is_empty_not_fatal() {
        let factory = FakeFactory::new(HashMap::from([(url("a"), widget(&["A1", "A2"], Duration::ZERO))]));

        let outcome = coordinator(&factory, 4, Duration::from_secs(5))
            .fetch_all(&listings(&["a", "b"]))
            .await;

        assert_eq!(outcome.result["a"].len(), 2);
        assert!(outcome.result["b"].is_empty());
        assert_eq!(outcome.empty, vec!["b"]);
    }

    #[tokio::test]
    async fn test_pool_size_does_not_change_result() {
        let ids = ["a", "b", "c", "d", "e"];
        let scripts: HashMap<String, FakeScript> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let latency = Duration::from_millis(5 * (ids.len() - i) as u64);
                (url(id), widget(&[*id, "shared"], latency))
            })
            .collect();
        let factory = FakeFactory::new(scripts);

        let serial = coordinator(&factory, 1, Duration::from_secs(5))
            .fetch_all(&listings(&ids))
            .await;
        let parallel = coordinator(&factory, 4, Duration::from_secs(5))
            .fetch_all(&listings(&ids))
            .await;

        assert_eq!(serial.result, parallel.result);
        assert_eq!(serial.result.len(), 5);
    }

    #[tokio::test]
    async fn test_sessions_bounded_by_pool_size() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let scripts = ids
            .iter()
            .map(|id| (url(id), widget(&["X"], Duration::from_millis(30))))
            .collect();
        let factory = FakeFactory::new(scripts);

        coordinator(&factory, 2, Duration::from_secs(5))
            .fetch_all(&listings(&ids))
            .await;

        factory.snapshot(|log| {
            assert_eq!(log.opened, 6);
            assert_eq!(log.closed, 6);
            assert!(log.max_active <= 2, "max_active = {}", log.max_active);
        });
    }

    #[tokio::test]
    async fn test_slow_listing_hits_task_timeout() {
        let factory = FakeFactory::new(HashMap::from([
            (url("fast"), widget(&["F"], Duration::ZERO)),
            (url("slow"), widget(&["S"], Duration::from_millis(400))),
        ]));

        let outcome = coordinator(&factory, 2, Duration::from_millis(50))
            .fetch_all(&listings(&["fast", "slow"]))
            .await;

        assert_eq!(outcome.result["fast"].len(), 1);
        assert!(outcome.result["slow"].is_empty());
    }
}
