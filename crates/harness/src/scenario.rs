//! Scenarios: independent test cases over resolved fixtures

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::warn;

use crate::config::SuiteConfig;
use crate::credentials::CredentialStore;
use crate::driver::Driver;
use crate::error::Result;
use crate::fixture::ResolvedDeps;
use crate::resolver::ScenarioEnv;

type ScenarioFn = Arc<dyn Fn(ScenarioCtx) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// One named test case: the fixture names it requests plus the body that
/// runs against the resolved instances. Every execution gets a fresh
/// resolution scope; nothing persists across scenarios.
#[derive(Clone)]
pub struct Scenario {
    pub name: String,
    pub epic: Option<String>,
    pub feature: Option<String>,
    pub tags: Vec<String>,
    pub fixtures: Vec<String>,
    pub(crate) body: ScenarioFn,
}

impl Scenario {
    pub fn new(name: &str) -> ScenarioBuilder {
        ScenarioBuilder {
            name: name.to_string(),
            epic: None,
            feature: None,
            tags: Vec::new(),
            fixtures: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub struct ScenarioBuilder {
    name: String,
    epic: Option<String>,
    feature: Option<String>,
    tags: Vec<String>,
    fixtures: Vec<String>,
}

impl ScenarioBuilder {
    pub fn epic(mut self, epic: &str) -> Self {
        self.epic = Some(epic.to_string());
        self
    }

    pub fn feature(mut self, feature: &str) -> Self {
        self.feature = Some(feature.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// The fixture names resolved (in order) before the body runs
    pub fn fixtures(mut self, names: &[&str]) -> Self {
        self.fixtures = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn run<F, Fut>(self, body: F) -> Scenario
    where
        F: Fn(ScenarioCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Scenario {
            name: self.name,
            epic: self.epic,
            feature: self.feature,
            tags: self.tags,
            fixtures: self.fixtures,
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }
}

/// What a scenario body sees: the resolved fixtures plus step/parameter/
/// attachment recording, all delegated to the report sink
pub struct ScenarioCtx {
    env: ScenarioEnv,
    values: ResolvedDeps,
}

impl ScenarioCtx {
    pub(crate) fn new(env: ScenarioEnv, values: ResolvedDeps) -> Self {
        Self { env, values }
    }

    pub fn name(&self) -> &str {
        &self.env.scenario
    }

    pub fn driver(&self) -> Arc<dyn Driver> {
        self.env.driver.clone()
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.env.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.env.credentials
    }

    /// Typed access to a fixture requested in the scenario declaration
    pub fn fixture<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.values.get(name)
    }

    /// Run a future as a named report step
    pub async fn step<T, Fut>(&self, name: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.env.reporter.step_started(&self.env.scenario, name);
        let result = fut.await;
        self.env
            .reporter
            .step_finished(&self.env.scenario, name, result.is_ok());
        result
    }

    /// Record a named parameter for the report
    pub fn parameter(&self, key: &str, value: &str) {
        self.env.reporter.parameter(&self.env.scenario, key, value);
    }

    /// Record a binary attachment for the report
    pub fn attach(&self, name: &str, mime: &str, bytes: &[u8]) {
        self.env
            .reporter
            .attachment(&self.env.scenario, name, mime, bytes);
    }

    /// Capture a page screenshot and attach it. Best-effort: capture
    /// failures are logged, never propagated.
    pub async fn attach_screenshot(&self, name: &str) {
        match self.env.driver.screenshot(None).await {
            Ok(bytes) => self.attach(name, "image/png", &bytes),
            Err(e) => warn!(scenario = %self.env.scenario, attachment = name, error = %e,
                "screenshot capture failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_metadata() {
        let scenario = Scenario::new("checkout-happy-path")
            .epic("E-commerce")
            .feature("Purchase Flow")
            .tag("smoke")
            .fixtures(&["order_complete_page"])
            .run(|_ctx| async { Ok(()) });

        assert_eq!(scenario.name, "checkout-happy-path");
        assert_eq!(scenario.epic.as_deref(), Some("E-commerce"));
        assert_eq!(scenario.feature.as_deref(), Some("Purchase Flow"));
        assert!(scenario.has_tag("smoke"));
        assert!(!scenario.has_tag("visual"));
        assert_eq!(scenario.fixtures, vec!["order_complete_page"]);
    }
}
