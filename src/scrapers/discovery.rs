use crate::models::Listing;
use crate::scrapers::parse::parse_listing_cards;
use crate::scrapers::traits::{DriverFactory, PageDriver};
use crate::scrapers::types::ExtractorSettings;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Enumerates apartment complexes on search-result pages
pub struct ListingDiscovery {
    factory: Arc<dyn DriverFactory>,
    settings: ExtractorSettings,
    lease_suffix: String,
}

impl ListingDiscovery {
    pub fn new(factory: Arc<dyn DriverFactory>, settings: ExtractorSettings, lease_suffix: &str) -> Self {
        Self {
            factory,
            settings,
            lease_suffix: lease_suffix.to_string(),
        }
    }

    /// Listings on one search page; a page that fails to render yields none
    pub fn discover(&self, search_url: &str) -> Vec<Listing> {
        match self.try_discover(search_url) {
            Ok(listings) => {
                info!(search = search_url, count = listings.len(), "Discovered listings");
                listings
            }
            Err(e) => {
                warn!(search = search_url, "Discovery failed: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Listings across every search page, first occurrence of a complex wins
    pub fn discover_all(&self, search_urls: &[String]) -> Vec<Listing> {
        let mut listings: Vec<Listing> = Vec::new();
        for search_url in search_urls {
            for listing in self.discover(search_url) {
                if listings.iter().any(|l| l.complex_id == listing.complex_id) {
                    continue;
                }
                listings.push(listing);
            }
        }
        listings
    }

    fn try_discover(&self, search_url: &str) -> Result<Vec<Listing>> {
        let base = Url::parse(search_url).with_context(|| format!("Invalid search URL {}", search_url))?;
        let mut driver = self.factory.open()?;
        let result = self.read_cards(driver.as_mut(), &base);
        driver.close();
        result
    }

    fn read_cards(&self, driver: &mut dyn PageDriver, base: &Url) -> Result<Vec<Listing>> {
        let cards = &self.settings.selectors.result_cards;

        driver.navigate(base.as_str())?;
        if !driver.wait_until(cards, self.settings.results_timeout) {
            bail!("no result cards matched {} within {:?}", cards, self.settings.results_timeout);
        }

        let html = driver.content()?;
        let listings = parse_listing_cards(&html, base, &self.lease_suffix);
        if listings.is_empty() {
            bail!("result cards present but none had a usable link");
        }
        Ok(listings)
    }
}
