//! Scriptable driver double for harness and fixture tests
//!
//! Every action is appended to a log (`"click:#login-button"` style) so
//! tests can assert on what the suite actually drove, and page state is
//! scripted up front: static text/count maps, click-to-URL transitions and
//! failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;

use crate::config::{SuiteConfig, Viewport};
use crate::driver::{Driver, DriverFactory, RouteAction};
use crate::error::{Error, Result};

#[derive(Default)]
struct MockState {
    current_url: String,
    texts: HashMap<String, String>,
    text_lists: HashMap<String, Vec<String>>,
    counts: HashMap<String, usize>,
    click_urls: HashMap<String, String>,
    eval_results: HashMap<String, serde_json::Value>,
    fail_selectors: HashSet<String>,
    log: Vec<String>,
}

/// In-memory [`Driver`] with scripted responses and a recorded action log
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
    screenshot: Vec<u8>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripted inner text for a selector
    pub fn with_text(self, selector: &str, text: &str) -> Self {
        self.state.lock().texts.insert(selector.to_string(), text.to_string());
        self
    }

    /// Scripted inner texts for a selector matching several elements
    pub fn with_texts(self, selector: &str, texts: &[&str]) -> Self {
        self.state.lock().text_lists.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Scripted element count for a selector
    pub fn with_count(self, selector: &str, count: usize) -> Self {
        self.state.lock().counts.insert(selector.to_string(), count);
        self
    }

    /// Clicking this selector moves the page to the given URL
    pub fn with_url_on_click(self, selector: &str, url: &str) -> Self {
        self.state
            .lock()
            .click_urls
            .insert(selector.to_string(), url.to_string());
        self
    }

    /// Scripted result for an evaluated script
    pub fn with_eval(self, script: &str, value: serde_json::Value) -> Self {
        self.state
            .lock()
            .eval_results
            .insert(script.to_string(), value);
        self
    }

    /// Any action against this selector fails with a driver error
    pub fn failing_on(self, selector: &str) -> Self {
        self.state.lock().fail_selectors.insert(selector.to_string());
        self
    }

    pub fn with_screenshot(mut self, bytes: Vec<u8>) -> Self {
        self.screenshot = bytes;
        self
    }

    /// Re-script a selector's text mid-test
    pub fn set_text(&self, selector: &str, text: &str) {
        self.state.lock().texts.insert(selector.to_string(), text.to_string());
    }

    /// The recorded action log
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// How many logged actions exactly equal `action`
    pub fn action_count(&self, action: &str) -> usize {
        self.state.lock().log.iter().filter(|a| *a == action).count()
    }

    fn record(&self, action: String, selector: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.log.push(action.clone());
        if state.fail_selectors.contains(selector) {
            return Err(Error::Driver(format!("scripted failure: {action}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{url}"), url)?;
        self.state.lock().current_url = url.to_string();
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("fill:{selector}={value}"), selector)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{selector}"), selector)?;
        let mut state = self.state.lock();
        if let Some(url) = state.click_urls.get(selector).cloned() {
            state.current_url = url;
        }
        Ok(())
    }

    async fn select(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select:{selector}={value}"), selector)
    }

    async fn text(&self, selector: &str) -> Result<String> {
        self.record(format!("text:{selector}"), selector)?;
        self.state
            .lock()
            .texts
            .get(selector)
            .cloned()
            .ok_or_else(|| Error::Driver(format!("no scripted text for {selector}")))
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        self.record(format!("texts:{selector}"), selector)?;
        Ok(self
            .state
            .lock()
            .text_lists
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.record(format!("count:{selector}"), selector)?;
        Ok(self.state.lock().counts.get(selector).copied().unwrap_or(0))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.record(format!("visible:{selector}"), selector)?;
        let state = self.state.lock();
        Ok(state.texts.contains_key(selector)
            || state.counts.get(selector).copied().unwrap_or(0) > 0)
    }

    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>> {
        let target = selector.unwrap_or("page");
        self.record(format!("screenshot:{target}"), target)?;
        Ok(self.screenshot.clone())
    }

    async fn wait_for_url(&self, pattern: &str) -> Result<()> {
        self.record(format!("wait_for_url:{pattern}"), pattern)?;
        let url = self.state.lock().current_url.clone();
        let re = Regex::new(pattern).map_err(|e| Error::Driver(e.to_string()))?;
        if re.is_match(&url) {
            Ok(())
        } else {
            Err(Error::Driver(format!(
                "url '{url}' never matched '{pattern}'"
            )))
        }
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().current_url.clone())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.record(
            format!("set_viewport:{}x{}", viewport.width, viewport.height),
            "viewport",
        )
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.record(format!("evaluate:{script}"), script)?;
        Ok(self
            .state
            .lock()
            .eval_results
            .get(script)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn route(&self, pattern: &str, action: RouteAction) -> Result<()> {
        let action = match action {
            RouteAction::Delay(ms) => format!("delay({ms})"),
            RouteAction::Abort => "abort".to_string(),
        };
        self.record(format!("route:{pattern}={action}"), pattern)
    }

    async fn unroute(&self, pattern: &str) -> Result<()> {
        self.record(format!("unroute:{pattern}"), pattern)
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().log.push("close".to_string());
        Ok(())
    }
}

/// Hands out one shared [`MockDriver`] so tests can inspect the action log
/// after a run
pub struct MockDriverFactory {
    driver: Arc<MockDriver>,
}

impl MockDriverFactory {
    pub fn shared(driver: Arc<MockDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn create(&self, _config: &SuiteConfig) -> Result<Arc<dyn Driver>> {
        Ok(self.driver.clone())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
