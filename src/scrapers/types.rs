use crate::config::BrowserConfig;
use crate::scrapers::traits::Locator;
use std::time::Duration;

/// Search-result cards linking to each complex, matched by class so extra
/// classes on a card do not hide it
pub const RESULT_CARD_CSS: &str = "div#results-cards > div > a.card-wrapper";

/// Element locators for the search page and the leasing widget
#[derive(Debug, Clone)]
pub struct WidgetSelectors {
    /// Search-result cards linking to each complex
    pub result_cards: Locator,
    /// The leasing widget iframe on a complex's lease page
    pub widget_frame: Locator,
    /// "Start" button inside the widget
    pub start_button: Locator,
    /// Unit-type links shown after Start
    pub unit_type_link: Locator,
    /// Floorplan tile containers
    pub floorplan_tile: Locator,
}

impl WidgetSelectors {
    pub fn for_frame(frame_name: &str) -> Self {
        Self {
            result_cards: Locator::css(RESULT_CARD_CSS),
            widget_frame: Locator::css(format!(
                "iframe[name='{0}'], iframe#{0}",
                frame_name
            )),
            start_button: Locator::xpath(
                "//button[contains(@class, 'primary')][contains(text(), 'Start')]",
            ),
            unit_type_link: Locator::xpath("//a[contains(@class, 'ng-binding')]"),
            floorplan_tile: Locator::css("div.floorplan-tile"),
        }
    }
}

/// Timeouts and locators driving one extraction
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub frame_name: String,
    /// T1: how long the widget iframe may take to appear
    pub load_timeout: Duration,
    /// Bound on every later wait inside the widget
    pub step_timeout: Duration,
    /// How long the search page may take to render result cards
    pub results_timeout: Duration,
    pub selectors: WidgetSelectors,
}

impl ExtractorSettings {
    pub fn from_config(browser: &BrowserConfig, results_timeout_secs: u64) -> Self {
        Self {
            frame_name: browser.frame_name.clone(),
            load_timeout: Duration::from_secs(browser.load_timeout_secs),
            step_timeout: Duration::from_secs(browser.step_timeout_secs),
            results_timeout: Duration::from_secs(results_timeout_secs),
            selectors: WidgetSelectors::for_frame(&browser.frame_name),
        }
    }
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        let frame_name = "rp-leasing-widget".to_string();
        Self {
            selectors: WidgetSelectors::for_frame(&frame_name),
            frame_name,
            load_timeout: Duration::from_secs(60),
            step_timeout: Duration::from_secs(60),
            results_timeout: Duration::from_secs(30),
        }
    }
}
