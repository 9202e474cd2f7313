use anyhow::Result;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How an element is located on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Self::XPath(query.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{}", s),
            Self::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// Snapshot of an element found by a locator.
///
/// Handles are re-resolved by `(locator, index)` when clicked, so they stay
/// valid across the widget re-rendering unrelated parts of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub locator: Locator,
    pub index: usize,
    pub text: String,
}

/// A page load that did not finish within the session's load timeout.
///
/// Drivers return it (wrapped in `anyhow::Error`) from `navigate` and
/// `switch_to_frame` so callers can tell slow pages from broken sessions.
#[derive(Debug, Error)]
#[error("page did not finish loading within {0:?}")]
pub struct NavigationTimeout(pub Duration);

/// Capabilities the scrapers need from a controllable browser session.
///
/// One value is one session: it is never shared between listings.
pub trait PageDriver: Send {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Block until the locator matches at least one element or the timeout elapses
    fn wait_until(&mut self, locator: &Locator, timeout: Duration) -> bool;

    fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    fn click(&mut self, element: &ElementHandle) -> Result<()>;

    /// Enter the context of the named iframe
    fn switch_to_frame(&mut self, name: &str) -> Result<()>;

    /// HTML of the active browsing context
    fn content(&mut self) -> Result<String>;

    fn close(&mut self);
}

/// Creates fresh browser sessions, one per call
pub trait DriverFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn PageDriver>>;
}
