//! Playwright browser automation over a node bridge
//!
//! One long-lived `node` subprocess runs a small bridge script: requests go
//! in as JSON lines on stdin, responses come back as JSON lines on stdout,
//! matched by id. Each scenario gets its own isolated browser context (and
//! page); screenshots cross the pipe base64-encoded.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info};

use storecheck_harness::{
    config::Viewport, Driver, DriverFactory, Error, Result, RouteAction, SuiteConfig,
};

/// Browser engine to launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "firefox" => BrowserKind::Firefox,
            "webkit" => BrowserKind::Webkit,
            _ => BrowserKind::Chromium,
        }
    }
}

const BRIDGE_JS: &str = r#"
'use strict';
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

const engines = { chromium, firefox, webkit };
let browser = null;
const contexts = new Map();
let nextCtx = 1;

function entry(req) {
  const e = contexts.get(req.ctx);
  if (!e) throw new Error('unknown context: ' + req.ctx);
  return e;
}

async function handle(req) {
  switch (req.cmd) {
    case 'launch': {
      browser = await engines[req.browser].launch({ headless: req.headless });
      return null;
    }
    case 'new_context': {
      const context = await browser.newContext({
        viewport: { width: req.width, height: req.height }
      });
      const page = await context.newPage();
      page.setDefaultTimeout(req.timeout_ms);
      const id = nextCtx++;
      contexts.set(id, { context, page, base: req.base_url });
      return id;
    }
    case 'close_context': {
      const e = contexts.get(req.ctx);
      if (e) {
        await e.context.close();
        contexts.delete(req.ctx);
      }
      return null;
    }
    case 'navigate': {
      const e = entry(req);
      await e.page.goto(new URL(req.url, e.base).toString());
      return null;
    }
    case 'fill': {
      await entry(req).page.fill(req.selector, req.value);
      return null;
    }
    case 'click': {
      await entry(req).page.click(req.selector);
      return null;
    }
    case 'select': {
      await entry(req).page.selectOption(req.selector, req.value);
      return null;
    }
    case 'text': {
      return await entry(req).page.locator(req.selector).first().innerText();
    }
    case 'texts': {
      return await entry(req).page.locator(req.selector).allInnerTexts();
    }
    case 'count': {
      return await entry(req).page.locator(req.selector).count();
    }
    case 'visible': {
      return await entry(req).page.locator(req.selector).first().isVisible();
    }
    case 'screenshot': {
      const page = entry(req).page;
      const target = req.selector ? page.locator(req.selector).first() : page;
      const buf = await target.screenshot();
      return buf.toString('base64');
    }
    case 'wait_url': {
      await entry(req).page.waitForURL(new RegExp(req.pattern));
      return null;
    }
    case 'url': {
      return entry(req).page.url();
    }
    case 'viewport': {
      await entry(req).page.setViewportSize({ width: req.width, height: req.height });
      return null;
    }
    case 'evaluate': {
      return await entry(req).page.evaluate(req.script);
    }
    case 'route': {
      const page = entry(req).page;
      const action = req.action;
      const delay = req.delay_ms || 0;
      await page.route(req.pattern, async (route) => {
        if (action === 'abort') return route.abort();
        if (delay > 0) await new Promise((r) => setTimeout(r, delay));
        return route.continue();
      });
      return null;
    }
    case 'unroute': {
      await entry(req).page.unroute(req.pattern);
      return null;
    }
    case 'shutdown': {
      if (browser) await browser.close();
      return null;
    }
    default:
      throw new Error('unknown command: ' + req.cmd);
  }
}

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', async (line) => {
  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    return;
  }
  try {
    const value = await handle(req);
    process.stdout.write(JSON.stringify({ id: req.id, ok: true, value }) + '\n');
  } catch (err) {
    const message = (err && err.message) ? err.message : String(err);
    process.stdout.write(JSON.stringify({ id: req.id, ok: false, error: message }) + '\n');
  }
  if (req.cmd === 'shutdown') process.exit(0);
});
"#;

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Handle to the running node bridge
pub struct BridgeProcess {
    stdin: AsyncMutex<ChildStdin>,
    child: AsyncMutex<Child>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>,
    next_id: AtomicU64,
    request_timeout: Duration,
    // Keeps the generated bridge script on disk for the process lifetime
    _script_dir: tempfile::TempDir,
}

impl BridgeProcess {
    /// Spawn the bridge and launch the browser
    pub async fn start(config: &SuiteConfig, browser: BrowserKind) -> Result<Arc<Self>> {
        check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_JS)?;

        info!(browser = browser.as_str(), "starting playwright bridge");

        let mut child = Command::new("node")
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Driver(format!("failed to spawn node: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Driver("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Driver("bridge stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Driver("bridge stderr unavailable".to_string()))?;

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<BridgeReply>(&line) {
                    Ok(reply) => {
                        if let Some(tx) = reader_pending.lock().remove(&reply.id) {
                            let _ = tx.send(reply);
                        }
                    }
                    Err(e) => debug!(error = %e, line = %line, "unparseable bridge output"),
                }
            }
            debug!("bridge stdout closed");
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[bridge] {line}");
            }
        });

        let bridge = Arc::new(Self {
            stdin: AsyncMutex::new(stdin),
            child: AsyncMutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: Duration::from_millis(
                config.action_timeout_ms.saturating_mul(2).saturating_add(5_000),
            ),
            _script_dir: script_dir,
        });

        bridge
            .request(json!({
                "cmd": "launch",
                "browser": browser.as_str(),
                "headless": config.headless,
            }))
            .await?;

        Ok(bridge)
    }

    /// Send one command and await its reply
    pub async fn request(&self, mut cmd: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Value::Object(map) = &mut cmd {
            map.insert("id".to_string(), json!(id));
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&cmd)?;
        line.push('\n');
        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| Error::Driver(format!("bridge write failed: {e}")))?;
            stdin
                .flush()
                .await
                .map_err(|e| Error::Driver(format!("bridge flush failed: {e}")))?;
        }

        let reply = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(Error::Driver("bridge closed before replying".to_string()));
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(Error::Driver(format!(
                    "bridge request timed out after {} ms",
                    self.request_timeout.as_millis()
                )));
            }
        };

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(Error::Driver(
                reply.error.unwrap_or_else(|| "bridge error".to_string()),
            ))
        }
    }

    /// Ask the bridge to close the browser and exit, escalating to SIGTERM
    /// and then kill if it does not
    pub async fn shutdown(&self) -> Result<()> {
        info!("stopping playwright bridge");
        let _ = self.request(json!({"cmd": "shutdown"})).await;

        let mut child = self.child.lock().await;
        if let Ok(Ok(_)) = tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            return Ok(());
        }

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        let _ = child.kill().await;
        let _ = child.wait().await;
        Ok(())
    }
}

/// Check that node can see a Playwright installation
fn check_playwright_installed() -> Result<()> {
    let status = std::process::Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(Error::Driver(
            "playwright not found; install with: npx playwright install".to_string(),
        )),
    }
}

/// One isolated browser context, driven through the shared bridge
pub struct PlaywrightDriver {
    bridge: Arc<BridgeProcess>,
    ctx: u64,
}

fn expect_str(value: Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Driver("bridge returned a non-string value".to_string()))
}

fn expect_u64(value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::Driver("bridge returned a non-numeric value".to_string()))
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(ctx = self.ctx, url, "navigate");
        self.bridge
            .request(json!({"cmd": "navigate", "ctx": self.ctx, "url": url}))
            .await
            .map(|_| ())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.bridge
            .request(json!({"cmd": "fill", "ctx": self.ctx, "selector": selector, "value": value}))
            .await
            .map(|_| ())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        debug!(ctx = self.ctx, selector, "click");
        self.bridge
            .request(json!({"cmd": "click", "ctx": self.ctx, "selector": selector}))
            .await
            .map(|_| ())
    }

    async fn select(&self, selector: &str, value: &str) -> Result<()> {
        self.bridge
            .request(
                json!({"cmd": "select", "ctx": self.ctx, "selector": selector, "value": value}),
            )
            .await
            .map(|_| ())
    }

    async fn text(&self, selector: &str) -> Result<String> {
        let value = self
            .bridge
            .request(json!({"cmd": "text", "ctx": self.ctx, "selector": selector}))
            .await?;
        expect_str(value)
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let value = self
            .bridge
            .request(json!({"cmd": "texts", "ctx": self.ctx, "selector": selector}))
            .await?;
        let items = value
            .as_array()
            .ok_or_else(|| Error::Driver("bridge returned a non-array value".to_string()))?;
        items.iter().cloned().map(expect_str).collect()
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let value = self
            .bridge
            .request(json!({"cmd": "count", "ctx": self.ctx, "selector": selector}))
            .await?;
        Ok(expect_u64(&value)? as usize)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let value = self
            .bridge
            .request(json!({"cmd": "visible", "ctx": self.ctx, "selector": selector}))
            .await?;
        value
            .as_bool()
            .ok_or_else(|| Error::Driver("bridge returned a non-boolean value".to_string()))
    }

    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>> {
        let value = self
            .bridge
            .request(json!({"cmd": "screenshot", "ctx": self.ctx, "selector": selector}))
            .await?;
        let encoded = expect_str(value)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Driver(format!("undecodable screenshot: {e}")))
    }

    async fn wait_for_url(&self, pattern: &str) -> Result<()> {
        self.bridge
            .request(json!({"cmd": "wait_url", "ctx": self.ctx, "pattern": pattern}))
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self
            .bridge
            .request(json!({"cmd": "url", "ctx": self.ctx}))
            .await?;
        expect_str(value)
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.bridge
            .request(json!({
                "cmd": "viewport",
                "ctx": self.ctx,
                "width": viewport.width,
                "height": viewport.height,
            }))
            .await
            .map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.bridge
            .request(json!({"cmd": "evaluate", "ctx": self.ctx, "script": script}))
            .await
    }

    async fn route(&self, pattern: &str, action: RouteAction) -> Result<()> {
        let (action, delay_ms) = match action {
            RouteAction::Abort => ("abort", 0),
            RouteAction::Delay(ms) => ("delay", ms),
        };
        self.bridge
            .request(json!({
                "cmd": "route",
                "ctx": self.ctx,
                "pattern": pattern,
                "action": action,
                "delay_ms": delay_ms,
            }))
            .await
            .map(|_| ())
    }

    async fn unroute(&self, pattern: &str) -> Result<()> {
        self.bridge
            .request(json!({"cmd": "unroute", "ctx": self.ctx, "pattern": pattern}))
            .await
            .map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        self.bridge
            .request(json!({"cmd": "close_context", "ctx": self.ctx}))
            .await
            .map(|_| ())
    }
}

/// Lazily starts one bridge for the suite and hands out an isolated
/// browser context per scenario
pub struct PlaywrightFactory {
    browser: BrowserKind,
    bridge: AsyncMutex<Option<Arc<BridgeProcess>>>,
}

impl PlaywrightFactory {
    pub fn new(browser: BrowserKind) -> Self {
        Self {
            browser,
            bridge: AsyncMutex::new(None),
        }
    }
}

#[async_trait]
impl DriverFactory for PlaywrightFactory {
    async fn create(&self, config: &SuiteConfig) -> Result<Arc<dyn Driver>> {
        let bridge = {
            let mut guard = self.bridge.lock().await;
            if guard.is_none() {
                *guard = Some(BridgeProcess::start(config, self.browser).await?);
            }
            guard
                .as_ref()
                .cloned()
                .ok_or_else(|| Error::Driver("bridge unavailable".to_string()))?
        };

        let value = bridge
            .request(json!({
                "cmd": "new_context",
                "width": config.viewport.width,
                "height": config.viewport.height,
                "base_url": config.base_url,
                "timeout_ms": config.action_timeout_ms,
            }))
            .await?;
        let ctx = expect_u64(&value)?;
        debug!(ctx, "created browser context");

        Ok(Arc::new(PlaywrightDriver { bridge, ctx }))
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(bridge) = self.bridge.lock().await.take() {
            bridge.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_kinds_round_trip() {
        for kind in [BrowserKind::Chromium, BrowserKind::Firefox, BrowserKind::Webkit] {
            assert_eq!(BrowserKind::parse(kind.as_str()), kind);
        }
        assert_eq!(BrowserKind::parse("edge"), BrowserKind::Chromium);
    }

    #[test]
    fn replies_parse_with_and_without_value() {
        let ok: BridgeReply = serde_json::from_str(r#"{"id":3,"ok":true,"value":7}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.value, serde_json::json!(7));

        let err: BridgeReply =
            serde_json::from_str(r#"{"id":4,"ok":false,"error":"no such element"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("no such element"));
        assert_eq!(err.value, Value::Null);

        let bare: BridgeReply = serde_json::from_str(r#"{"id":5,"ok":true}"#).unwrap();
        assert_eq!(bare.value, Value::Null);
        assert_eq!(bare.id, 5);
    }

    #[test]
    fn bridge_script_covers_the_driver_surface() {
        for cmd in [
            "launch", "new_context", "close_context", "navigate", "fill", "click", "select",
            "text", "texts", "count", "visible", "screenshot", "wait_url", "url", "viewport",
            "evaluate", "route", "unroute", "shutdown",
        ] {
            assert!(
                BRIDGE_JS.contains(&format!("case '{cmd}':")),
                "bridge script is missing '{cmd}'"
            );
        }
    }
}
