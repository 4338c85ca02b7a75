//! Per-scenario fixture resolution
//!
//! A [`ResolutionScope`] lives for exactly one scenario execution. Resolution
//! is depth-first, left-to-right in declaration order, and memoized: a
//! fixture's setup runs at most once per scope, and every consumer observes
//! the identical instance. Teardown runs in strict reverse resolution order,
//! each callback inside its own failure-isolation boundary.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::config::SuiteConfig;
use crate::credentials::CredentialStore;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::fixture::{downcast, FixtureCtx, FixtureRegistry, FixtureValue, ResolvedDeps, TeardownFn};
use crate::report::ReportSink;

/// Shared collaborators for one scenario execution
#[derive(Clone)]
pub struct ScenarioEnv {
    pub scenario: String,
    pub driver: Arc<dyn Driver>,
    pub reporter: Arc<dyn ReportSink>,
    pub credentials: Arc<CredentialStore>,
    pub config: Arc<SuiteConfig>,
}

/// Memoized fixture instances and their pending teardowns for one scenario
pub struct ResolutionScope {
    registry: Arc<FixtureRegistry>,
    env: ScenarioEnv,
    resolved: HashMap<String, FixtureValue>,
    order: Vec<String>,
    teardowns: Vec<(String, TeardownFn)>,
}

impl ResolutionScope {
    pub fn new(registry: Arc<FixtureRegistry>, env: ScenarioEnv) -> Self {
        Self {
            registry,
            env,
            resolved: HashMap::new(),
            order: Vec::new(),
            teardowns: Vec::new(),
        }
    }

    /// Resolve a fixture by name, running its setup (and its dependencies'
    /// setups) on first demand
    pub async fn resolve(&mut self, name: &str) -> Result<FixtureValue> {
        self.resolve_inner(name.to_string()).await
    }

    fn resolve_inner(&mut self, name: String) -> BoxFuture<'_, Result<FixtureValue>> {
        Box::pin(async move {
            if let Some(value) = self.resolved.get(&name) {
                return Ok(value.clone());
            }

            let (dep_names, setup) = {
                let def = self
                    .registry
                    .get(&name)
                    .ok_or_else(|| Error::UnknownFixture(name.clone()))?;
                (def.deps.clone(), def.setup.clone())
            };

            let mut deps = HashMap::new();
            for dep in dep_names {
                let value = self.resolve_inner(dep.clone()).await?;
                deps.insert(dep, value);
            }

            debug!(fixture = %name, scenario = %self.env.scenario, "running fixture setup");
            let ctx = FixtureCtx {
                scenario: self.env.scenario.clone(),
                driver: self.env.driver.clone(),
                reporter: self.env.reporter.clone(),
                credentials: self.env.credentials.clone(),
                config: self.env.config.clone(),
                deps: ResolvedDeps::new(deps),
            };

            let output = setup(ctx).await.map_err(|e| {
                warn!(fixture = %name, error = %e, "fixture setup failed");
                e
            })?;

            self.resolved.insert(name.clone(), output.value.clone());
            self.order.push(name.clone());
            if let Some(teardown) = output.teardown {
                self.teardowns.push((name, teardown));
            }

            Ok(output.value)
        })
    }

    /// Typed access to an already-resolved instance
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self
            .resolved
            .get(name)
            .ok_or_else(|| Error::UnknownFixture(name.to_string()))?;
        downcast(name, value)
    }

    /// Names in the order their setups ran
    pub fn resolution_order(&self) -> &[String] {
        &self.order
    }

    /// Snapshot of every resolved instance, for handing to the scenario body
    pub fn snapshot(&self) -> ResolvedDeps {
        ResolvedDeps::new(self.resolved.clone())
    }

    /// Run every pending teardown in reverse resolution order.
    ///
    /// A failing teardown never prevents the remaining teardowns from
    /// running and never propagates; failures are logged and returned so the
    /// runner can surface them as non-fatal report annotations.
    pub async fn teardown_all(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();

        while let Some((name, teardown)) = self.teardowns.pop() {
            debug!(fixture = %name, scenario = %self.env.scenario, "running fixture teardown");
            if let Err(e) = teardown().await {
                warn!(fixture = %name, error = %e, "fixture teardown failed");
                failures.push(Error::Teardown {
                    fixture: name,
                    reason: e.to_string(),
                });
            }
        }

        self.resolved.clear();
        self.order.clear();
        failures
    }
}
