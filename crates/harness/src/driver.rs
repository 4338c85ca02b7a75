//! The browser automation seam
//!
//! The harness depends on this narrow action surface only; the concrete
//! engine (a Playwright bridge in production, a scripted mock in tests)
//! lives behind it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{SuiteConfig, Viewport};
use crate::error::Result;

/// What an intercepted network route does with matching requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Hold each matching request for this many milliseconds, then continue
    Delay(u64),

    /// Fail each matching request
    Abort,
}

/// Handle to one isolated browser context
///
/// All selectors use the engine's selector syntax; URLs may be relative to
/// the configured base URL. Implementations own per-action deadlines.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Select an option of a `<select>` element by value
    async fn select(&self, selector: &str, value: &str) -> Result<()>;

    /// Inner text of the first match
    async fn text(&self, selector: &str) -> Result<String>;

    /// Inner texts of every match, in document order
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &str) -> Result<usize>;

    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// PNG screenshot of the page, or of the first match when a selector
    /// is given
    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>>;

    /// Wait until the current URL matches the regex pattern
    async fn wait_for_url(&self, pattern: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    /// Evaluate a JavaScript expression in the page, returning its
    /// JSON-serialized result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Intercept requests matching a URL glob pattern
    async fn route(&self, pattern: &str, action: RouteAction) -> Result<()>;

    /// Remove interception for a previously routed pattern
    async fn unroute(&self, pattern: &str) -> Result<()>;

    /// Release the underlying context
    async fn close(&self) -> Result<()>;
}

/// Produces one isolated [`Driver`] per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, config: &SuiteConfig) -> Result<Arc<dyn Driver>>;

    /// Release engine-wide resources at the end of the suite
    async fn shutdown(&self) -> Result<()>;
}
