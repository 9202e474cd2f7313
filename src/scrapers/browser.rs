use crate::config::BrowserConfig;
use crate::scrapers::traits::{DriverFactory, ElementHandle, Locator, NavigationTimeout, PageDriver};
use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Launches one headless Chrome per session
pub struct ChromeDriverFactory {
    headless: bool,
    window_size: (u32, u32),
    load_timeout: Duration,
}

impl ChromeDriverFactory {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            window_size: (config.window_width, config.window_height),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
        }
    }
}

impl DriverFactory for ChromeDriverFactory {
    fn open(&self) -> Result<Box<dyn PageDriver>> {
        debug!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .window_size(Some(self.window_size))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_default_timeout(self.load_timeout);

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
            load_timeout: self.load_timeout,
        }))
    }
}

/// One browser process and the tab it drives
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    load_timeout: Duration,
}

impl ChromeSession {
    fn find_elements(&self, locator: &Locator) -> Result<Vec<Element<'_>>> {
        match locator {
            Locator::Css(s) => self.tab.find_elements(s),
            Locator::XPath(s) => self.tab.find_elements_by_xpath(s),
        }
    }
}

impl PageDriver for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        self.tab.wait_until_navigated().map_err(|e| {
            if e.downcast_ref::<headless_chrome::util::Timeout>().is_some() {
                anyhow::Error::from(NavigationTimeout(self.load_timeout))
            } else {
                e
            }
        })?;
        Ok(())
    }

    fn wait_until(&mut self, locator: &Locator, timeout: Duration) -> bool {
        let found = match locator {
            Locator::Css(s) => self.tab.wait_for_element_with_custom_timeout(s, timeout).map(|_| ()),
            Locator::XPath(s) => self.tab.wait_for_xpath_with_custom_timeout(s, timeout).map(|_| ()),
        };
        if let Err(e) = &found {
            debug!(%locator, "Wait ended without a match: {}", e);
        }
        found.is_ok()
    }

    fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let elements = self.find_elements(locator)?;
        elements
            .iter()
            .enumerate()
            .map(|(index, el)| {
                Ok(ElementHandle {
                    locator: locator.clone(),
                    index,
                    text: el.get_inner_text()?,
                })
            })
            .collect()
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let elements = self.find_elements(&element.locator)?;
        let target = elements
            .get(element.index)
            .ok_or_else(|| anyhow!("{} #{} is gone", element.locator, element.index))?;
        target.click()?;
        Ok(())
    }

    /// Enter an iframe by loading its document in the tab.
    ///
    /// The DevTools protocol has no implicit frame context, so the frame's
    /// `src` becomes the page and later lookups run against the widget itself.
    fn switch_to_frame(&mut self, name: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const f = document.querySelector("iframe[name='{0}'], iframe#{0}");
                return f ? f.src : null;
            }})()"#,
            name
        );
        let src = self
            .tab
            .evaluate(&script, false)?
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("iframe '{}' has no src", name))?;

        info!(frame = name, src = %src, "Switching into widget frame");
        self.navigate(&src)
    }

    fn content(&mut self) -> Result<String> {
        self.tab.get_content()
    }

    fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                warn!("Failed to close tab: {}", e);
            }
            drop(browser);
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.close();
    }
}
