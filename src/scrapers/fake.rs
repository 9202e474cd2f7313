//! Scripted in-memory `PageDriver` for exercising the scrapers without Chrome.

use crate::scrapers::traits::{DriverFactory, ElementHandle, Locator, NavigationTimeout, PageDriver};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// What a URL looks like once loaded
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    /// Locators that resolve, with the text of each matching element
    pub elements: Vec<(Locator, Vec<String>)>,
    /// HTML returned by `content()` once inside the widget frame (or the page if no frame)
    pub content: String,
    /// Simulated page load time
    pub latency: Duration,
    /// Navigation never completes: `navigate` reports a load timeout of this length
    pub stalls_after: Option<Duration>,
}

impl FakeScript {
    pub fn with(mut self, locator: &Locator, texts: &[&str]) -> Self {
        self.elements
            .push((locator.clone(), texts.iter().map(|t| t.to_string()).collect()));
        self
    }

    pub fn content(mut self, html: impl Into<String>) -> Self {
        self.content = html.into();
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn stalled(mut self, after: Duration) -> Self {
        self.stalls_after = Some(after);
        self
    }

    fn texts(&self, locator: &Locator) -> Option<&Vec<String>> {
        self.elements
            .iter()
            .find(|(l, _)| l == locator)
            .map(|(_, texts)| texts)
    }
}

#[derive(Debug, Default)]
pub struct FakeLog {
    pub opened: usize,
    pub closed: usize,
    pub active: usize,
    pub max_active: usize,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub frames: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    scripts: Arc<HashMap<String, FakeScript>>,
    pub log: Arc<Mutex<FakeLog>>,
    fail_open: bool,
}

impl FakeFactory {
    pub fn new(scripts: HashMap<String, FakeScript>) -> Self {
        Self {
            scripts: Arc::new(scripts),
            log: Arc::default(),
            fail_open: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&FakeLog) -> T) -> T {
        f(&self.log.lock().unwrap())
    }
}

impl DriverFactory for FakeFactory {
    fn open(&self) -> Result<Box<dyn PageDriver>> {
        if self.fail_open {
            bail!("chrome binary not found");
        }
        {
            let mut log = self.log.lock().unwrap();
            log.opened += 1;
            log.active += 1;
            log.max_active = log.max_active.max(log.active);
        }
        Ok(Box::new(FakeSession {
            scripts: Arc::clone(&self.scripts),
            log: Arc::clone(&self.log),
            current: None,
            closed: false,
        }))
    }
}

pub struct FakeSession {
    scripts: Arc<HashMap<String, FakeScript>>,
    log: Arc<Mutex<FakeLog>>,
    current: Option<FakeScript>,
    closed: bool,
}

impl PageDriver for FakeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        let script = self.scripts.get(url).cloned().unwrap_or_default();
        if !script.latency.is_zero() {
            thread::sleep(script.latency);
        }
        if let Some(after) = script.stalls_after {
            self.current = None;
            return Err(NavigationTimeout(after).into());
        }
        self.current = Some(script);
        Ok(())
    }

    fn wait_until(&mut self, locator: &Locator, _timeout: Duration) -> bool {
        self.current
            .as_ref()
            .and_then(|s| s.texts(locator))
            .is_some_and(|texts| !texts.is_empty())
    }

    fn find(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let texts = self
            .current
            .as_ref()
            .and_then(|s| s.texts(locator))
            .cloned()
            .unwrap_or_default();
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| ElementHandle {
                locator: locator.clone(),
                index,
                text,
            })
            .collect())
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        self.log.lock().unwrap().clicks.push(element.text.clone());
        Ok(())
    }

    fn switch_to_frame(&mut self, name: &str) -> Result<()> {
        if self.current.is_none() {
            bail!("no page loaded");
        }
        self.log.lock().unwrap().frames.push(name.to_string());
        Ok(())
    }

    fn content(&mut self) -> Result<String> {
        Ok(self
            .current
            .as_ref()
            .map(|s| s.content.clone())
            .unwrap_or_default())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut log = self.log.lock().unwrap();
            log.closed += 1;
            log.active -= 1;
        }
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.close();
    }
}
