//! Suite runner: executes scenarios with deadlines, retries and worker
//! parallelism

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::SuiteConfig;
use crate::credentials::CredentialStore;
use crate::driver::DriverFactory;
use crate::error::{Error, Result};
use crate::fixture::FixtureRegistry;
use crate::graph;
use crate::report::{Label, ReportSink};
use crate::resolver::{ResolutionScope, ScenarioEnv};
use crate::scenario::{Scenario, ScenarioCtx};

/// Outcome of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub attempts: u32,
    pub error: Option<String>,
    pub teardown_errors: Vec<String>,
}

/// Outcome of the whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Drives scenarios against the fixture registry
pub struct SuiteRunner {
    registry: Arc<FixtureRegistry>,
    config: Arc<SuiteConfig>,
    credentials: Arc<CredentialStore>,
    reporter: Arc<dyn ReportSink>,
    factory: Arc<dyn DriverFactory>,
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner").finish_non_exhaustive()
    }
}

impl SuiteRunner {
    /// Build a runner, validating the composition graph up front. A cycle
    /// or an undeclared dependency aborts here, before any scenario runs.
    pub fn new(
        registry: FixtureRegistry,
        config: SuiteConfig,
        credentials: CredentialStore,
        reporter: Arc<dyn ReportSink>,
        factory: Arc<dyn DriverFactory>,
    ) -> Result<Self> {
        graph::validate(&registry)?;

        Ok(Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            reporter,
            factory,
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run every scenario, up to `config.workers` in flight at once.
    /// Failures never abort the suite; the aggregate result reflects them.
    pub async fn run(&self, scenarios: Vec<Scenario>) -> SuiteResult {
        let start = Instant::now();
        let total = scenarios.len();
        let workers = self.config.workers.max(1);

        info!("running {} scenario(s) with {} worker(s)...", total, workers);

        let mut results: Vec<(usize, ScenarioResult)> = stream::iter(
            scenarios.into_iter().enumerate(),
        )
        .map(|(index, scenario)| async move { (index, self.run_scenario(&scenario).await) })
        .buffer_unordered(workers)
        .collect()
        .await;
        results.sort_by_key(|(index, _)| *index);

        let results: Vec<ScenarioResult> = results.into_iter().map(|(_, r)| r).collect();
        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "suite finished: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total,
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    /// Run one scenario, retrying per configuration. Every attempt is fully
    /// isolated: fresh driver, fresh resolution scope.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut result = self.run_attempt(scenario).await;
            result.attempts = attempt;

            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
                return result;
            }

            if attempt > self.config.retries {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
                return result;
            }

            warn!(
                scenario = %scenario.name,
                attempt,
                "scenario failed, retrying"
            );
        }
    }

    async fn run_attempt(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let name = scenario.name.clone();

        self.reporter.scenario_started(&name);
        if let Some(epic) = &scenario.epic {
            self.reporter.label(&name, Label::Epic, epic);
        }
        if let Some(feature) = &scenario.feature {
            self.reporter.label(&name, Label::Feature, feature);
        }
        for tag in &scenario.tags {
            self.reporter.label(&name, Label::Tag, tag);
        }

        let driver = match self.factory.create(&self.config).await {
            Ok(driver) => driver,
            Err(e) => {
                return self.finish(&name, start, Some(e.to_string()), Vec::new());
            }
        };

        let env = ScenarioEnv {
            scenario: name.clone(),
            driver: driver.clone(),
            reporter: self.reporter.clone(),
            credentials: self.credentials.clone(),
            config: self.config.clone(),
        };
        let mut scope = ResolutionScope::new(self.registry.clone(), env.clone());
        let deadline = Duration::from_millis(self.config.scenario_timeout_ms);

        // Resolution plus body, under the scenario deadline. The outcome is
        // fixed here; teardown can no longer change it.
        let outcome: Result<()> = {
            let body = async {
                for fixture in &scenario.fixtures {
                    scope.resolve(fixture).await?;
                }
                let ctx = ScenarioCtx::new(env.clone(), scope.snapshot());
                (scenario.body)(ctx).await
            };
            match tokio::time::timeout(deadline, body).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.config.scenario_timeout_ms)),
            }
        };

        // Teardown always runs, in reverse resolution order, best-effort and
        // time-bounded on its own budget.
        let teardown_errors = match tokio::time::timeout(deadline, scope.teardown_all()).await {
            Ok(failures) => failures.iter().map(|e| e.to_string()).collect(),
            Err(_) => {
                warn!(scenario = %name, "teardown timed out");
                vec![Error::Timeout(self.config.scenario_timeout_ms).to_string()]
            }
        };
        for message in &teardown_errors {
            self.reporter.annotation(&name, message);
        }

        if let Err(e) = driver.close().await {
            warn!(scenario = %name, error = %e, "failed to close driver");
        }

        self.finish(
            &name,
            start,
            outcome.err().map(|e| e.to_string()),
            teardown_errors,
        )
    }

    fn finish(
        &self,
        name: &str,
        start: Instant,
        error: Option<String>,
        teardown_errors: Vec<String>,
    ) -> ScenarioResult {
        let result = ScenarioResult {
            name: name.to_string(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            attempts: 1,
            error,
            teardown_errors,
        };
        self.reporter.scenario_finished(name, &result);
        result
    }
}
