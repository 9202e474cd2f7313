use crate::error::ScoutError;
use crate::models::{AvailabilityRow, Listing};
use crate::scrapers::parse::parse_tiles;
use crate::scrapers::traits::{DriverFactory, Locator, NavigationTimeout, PageDriver};
use crate::scrapers::types::ExtractorSettings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Steps of the leasing widget interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractState {
    Loading,
    WidgetReady,
    UnitTypeSelection,
    TileParsing,
    Done,
    Failed,
}

impl ExtractState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Drives the leasing widget of one listing at a time.
///
/// Every listing gets its own session from the factory, released before
/// `extract` returns whatever the outcome.
pub struct AvailabilityExtractor {
    factory: Arc<dyn DriverFactory>,
    settings: ExtractorSettings,
}

impl AvailabilityExtractor {
    pub fn new(factory: Arc<dyn DriverFactory>, settings: ExtractorSettings) -> Self {
        Self { factory, settings }
    }

    /// Scrape one listing. Failures are logged and yield no rows.
    pub fn extract(&self, listing: &Listing) -> Vec<AvailabilityRow> {
        info!(complex = %listing.complex_id, url = %listing.url, "Processing listing");

        match self.try_extract(listing) {
            Ok(rows) => {
                info!(complex = %listing.complex_id, rows = rows.len(), "Listing done");
                rows
            }
            Err(e @ ScoutError::Parse(_)) => {
                warn!(url = %listing.url, kind = e.kind(), failed_in = ?e.state(), "Unable to parse {}: {}", listing.url, e);
                Vec::new()
            }
            Err(e) => {
                warn!(url = %listing.url, kind = e.kind(), failed_in = ?e.state(), "Page did not load {}: {}", listing.url, e);
                Vec::new()
            }
        }
    }

    /// Run the state machine in a fresh session, surfacing the failure class
    pub fn try_extract(&self, listing: &Listing) -> Result<Vec<AvailabilityRow>, ScoutError> {
        let mut driver = self
            .factory
            .open()
            .map_err(|e| ScoutError::session(ExtractState::Loading, format!("{:#}", e)))?;

        let result = self.drive(driver.as_mut(), &listing.url);
        driver.close();
        result
    }

    fn drive(&self, driver: &mut dyn PageDriver, url: &str) -> Result<Vec<AvailabilityRow>, ScoutError> {
        let mut state = ExtractState::Loading;
        let mut rows = Vec::new();

        while !state.is_terminal() {
            debug!(url, state = ?state, "Widget state");
            match self.step(driver, url, state, &mut rows) {
                Ok(next) => state = next,
                Err(e) => {
                    debug!(url, from = ?state, to = ?ExtractState::Failed, "Widget state");
                    return Err(e);
                }
            }
        }

        Ok(rows)
    }

    /// Perform the exit action of `state` and return the state that follows
    fn step(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        state: ExtractState,
        rows: &mut Vec<AvailabilityRow>,
    ) -> Result<ExtractState, ScoutError> {
        let sel = &self.settings.selectors;

        match state {
            ExtractState::Loading => {
                driver
                    .navigate(url)
                    .map_err(|e| self.load_error(state, e))?;
                self.wait(driver, &sel.widget_frame, self.settings.load_timeout, state)?;
                driver
                    .switch_to_frame(&self.settings.frame_name)
                    .map_err(|e| self.load_error(state, e))?;
                Ok(ExtractState::WidgetReady)
            }
            ExtractState::WidgetReady => {
                self.wait(driver, &sel.start_button, self.settings.step_timeout, state)?;
                self.click_first(driver, &sel.start_button, state)?;
                Ok(ExtractState::UnitTypeSelection)
            }
            ExtractState::UnitTypeSelection => {
                self.wait(driver, &sel.unit_type_link, self.settings.step_timeout, state)?;
                self.click_first(driver, &sel.unit_type_link, state)?;
                Ok(ExtractState::TileParsing)
            }
            ExtractState::TileParsing => {
                if !driver.wait_until(&sel.floorplan_tile, self.settings.step_timeout) {
                    return Err(ScoutError::Parse(format!(
                        "no floorplan tiles located ({})",
                        sel.floorplan_tile
                    )));
                }
                let html = driver
                    .content()
                    .map_err(|e| ScoutError::session(state, format!("{:#}", e)))?;
                *rows = parse_tiles(&html)?;
                Ok(ExtractState::Done)
            }
            ExtractState::Done | ExtractState::Failed => Ok(state),
        }
    }

    /// A page load that ran out of time is a timeout, anything else a session failure
    fn load_error(&self, state: ExtractState, e: anyhow::Error) -> ScoutError {
        match e.downcast_ref::<NavigationTimeout>() {
            Some(NavigationTimeout(waited)) => ScoutError::ExtractionTimeout {
                state,
                waited_secs: waited.as_secs(),
            },
            None => ScoutError::session(state, format!("{:#}", e)),
        }
    }

    fn wait(
        &self,
        driver: &mut dyn PageDriver,
        locator: &Locator,
        timeout: Duration,
        state: ExtractState,
    ) -> Result<(), ScoutError> {
        if driver.wait_until(locator, timeout) {
            Ok(())
        } else {
            Err(ScoutError::ExtractionTimeout {
                state,
                waited_secs: timeout.as_secs(),
            })
        }
    }

    fn click_first(
        &self,
        driver: &mut dyn PageDriver,
        locator: &Locator,
        state: ExtractState,
    ) -> Result<(), ScoutError> {
        let elements = driver
            .find(locator)
            .map_err(|e| ScoutError::session(state, format!("{:#}", e)))?;
        let first = elements
            .first()
            .ok_or_else(|| ScoutError::session(state, format!("{} vanished before click", locator)))?;
        debug!(text = %first.text, "Clicking {}", locator);
        driver
            .click(first)
            .map_err(|e| ScoutError::session(state, format!("{:#}", e)))
    }
}
