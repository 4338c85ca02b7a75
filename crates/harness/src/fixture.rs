//! Named fixture providers
//!
//! A fixture registers under a unique name with the names of the fixtures it
//! depends on and an async setup function. Setup receives the resolved
//! dependency instances and may capture a teardown closure into its output;
//! the resolver invokes captured teardowns in reverse resolution order after
//! the scenario body finishes.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::SuiteConfig;
use crate::credentials::CredentialStore;
use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::report::ReportSink;

/// A resolved fixture instance, shared by every consumer within one scenario
pub type FixtureValue = Arc<dyn Any + Send + Sync>;

/// Teardown closure captured at setup time
pub type TeardownFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

type SetupFn = Arc<dyn Fn(FixtureCtx) -> BoxFuture<'static, Result<FixtureOutput>> + Send + Sync>;

/// What a fixture setup returns: the resource instance plus an optional
/// teardown action
pub struct FixtureOutput {
    pub(crate) value: FixtureValue,
    pub(crate) teardown: Option<TeardownFn>,
}

impl FixtureOutput {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            teardown: None,
        }
    }

    /// Attach a teardown closure; it runs exactly once, after the scenario
    /// body and after every dependent fixture's teardown
    pub fn with_teardown<F, Fut>(mut self, teardown: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.teardown = Some(Box::new(move || teardown().boxed()));
        self
    }
}

/// Resolved dependency instances handed to a fixture setup
#[derive(Default)]
pub struct ResolvedDeps {
    values: HashMap<String, FixtureValue>,
}

impl ResolvedDeps {
    pub(crate) fn new(values: HashMap<String, FixtureValue>) -> Self {
        Self { values }
    }

    /// Typed access to a resolved instance by fixture name
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| Error::UnknownFixture(name.to_string()))?;
        downcast(name, value)
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(
    name: &str,
    value: &FixtureValue,
) -> Result<Arc<T>> {
    value
        .clone()
        .downcast::<T>()
        .map_err(|_| Error::FixtureType {
            fixture: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// Everything a fixture setup can reach: the scenario's driver, the report
/// sink, the credential table, the suite configuration and the resolved
/// dependencies
pub struct FixtureCtx {
    pub scenario: String,
    pub driver: Arc<dyn Driver>,
    pub reporter: Arc<dyn ReportSink>,
    pub credentials: Arc<CredentialStore>,
    pub config: Arc<SuiteConfig>,
    pub(crate) deps: ResolvedDeps,
}

impl FixtureCtx {
    /// Typed access to a declared dependency's instance
    pub fn dep<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.deps.get(name)
    }

    /// Run a future as a named report step
    pub async fn step<T, Fut>(&self, name: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.reporter.step_started(&self.scenario, name);
        let result = fut.await;
        self.reporter
            .step_finished(&self.scenario, name, result.is_ok());
        result
    }

    /// Record a binary attachment for the report
    pub fn attach(&self, name: &str, mime: &str, bytes: &[u8]) {
        self.reporter.attachment(&self.scenario, name, mime, bytes);
    }

    /// Record a named parameter for the report
    pub fn parameter(&self, key: &str, value: &str) {
        self.reporter.parameter(&self.scenario, key, value);
    }
}

/// One registered provider: unique name, declared dependencies, setup
pub struct FixtureDef {
    pub name: String,
    pub deps: Vec<String>,
    pub(crate) setup: SetupFn,
}

/// The full set of named providers; immutable once the suite starts
#[derive(Default)]
pub struct FixtureRegistry {
    defs: HashMap<String, FixtureDef>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Duplicate names are a configuration error.
    pub fn register<F, Fut>(&mut self, name: &str, deps: &[&str], setup: F) -> Result<()>
    where
        F: Fn(FixtureCtx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FixtureOutput>> + Send + 'static,
    {
        if self.defs.contains_key(name) {
            return Err(Error::Config(format!(
                "fixture '{}' registered twice",
                name
            )));
        }

        let def = FixtureDef {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            setup: Arc::new(move |ctx| setup(ctx).boxed()),
        };
        self.defs.insert(name.to_string(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FixtureDef> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Registered fixture names, sorted for deterministic diagnostics
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
