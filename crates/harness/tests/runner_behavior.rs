//! Scenario runner behavior: outcomes, deadlines, retries, teardown policy

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use storecheck_harness::mock::{MockDriver, MockDriverFactory};
use storecheck_harness::report::{Label, ReportSink};
use storecheck_harness::runner::ScenarioResult;
use storecheck_harness::{
    CredentialStore, Error, FixtureOutput, FixtureRegistry, NullReporter, Scenario, SuiteConfig,
    SuiteRunner,
};

type EventLog = Arc<Mutex<Vec<String>>>;

/// Sink that records annotations for inspection
#[derive(Default)]
struct RecordingSink {
    annotations: Mutex<Vec<String>>,
}

impl ReportSink for RecordingSink {
    fn scenario_started(&self, _scenario: &str) {}
    fn scenario_finished(&self, _scenario: &str, _result: &ScenarioResult) {}
    fn step_started(&self, _scenario: &str, _step: &str) {}
    fn step_finished(&self, _scenario: &str, _step: &str, _ok: bool) {}
    fn parameter(&self, _scenario: &str, _key: &str, _value: &str) {}
    fn attachment(&self, _scenario: &str, _name: &str, _mime: &str, _bytes: &[u8]) {}
    fn label(&self, _scenario: &str, _label: Label, _value: &str) {}

    fn annotation(&self, _scenario: &str, message: &str) {
        self.annotations.lock().push(message.to_string());
    }
}

fn runner_with(
    registry: FixtureRegistry,
    config: SuiteConfig,
    reporter: Arc<dyn ReportSink>,
) -> SuiteRunner {
    let factory = Arc::new(MockDriverFactory::shared(Arc::new(MockDriver::new())));
    SuiteRunner::new(
        registry,
        config,
        CredentialStore::builtin(),
        reporter,
        factory,
    )
    .unwrap()
}

fn logged_fixture(registry: &mut FixtureRegistry, name: &'static str, log: &EventLog) {
    let log = log.clone();
    registry
        .register(name, &[], move |_ctx| {
            let log = log.clone();
            async move {
                log.lock().push(format!("setup:{name}"));
                let teardown_log = log.clone();
                Ok(FixtureOutput::new(name.to_string()).with_teardown(move || async move {
                    teardown_log.lock().push(format!("teardown:{name}"));
                    Ok(())
                }))
            }
        })
        .unwrap();
}

#[tokio::test]
async fn failing_body_still_tears_down() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    logged_fixture(&mut registry, "session", &log);

    let runner = runner_with(registry, SuiteConfig::default(), Arc::new(NullReporter));
    let scenario = Scenario::new("mismatch")
        .fixtures(&["session"])
        .run(|_ctx| async { Err(Error::Assertion("wrong title".to_string())) });

    let result = runner.run_scenario(&scenario).await;
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or("").contains("wrong title"));
    assert_eq!(
        log.lock().clone(),
        vec!["setup:session", "teardown:session"]
    );
}

#[tokio::test]
async fn failing_setup_skips_the_body_but_not_teardown() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    logged_fixture(&mut registry, "base", &log);

    registry
        .register("broken", &["base"], |_ctx| async {
            Err::<FixtureOutput, _>(Error::Driver("navigation failed".to_string()))
        })
        .unwrap();

    let body_ran = Arc::new(AtomicBool::new(false));
    let flag = body_ran.clone();
    let scenario = Scenario::new("startup-failure")
        .fixtures(&["broken"])
        .run(move |_ctx| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        });

    let runner = runner_with(registry, SuiteConfig::default(), Arc::new(NullReporter));
    let result = runner.run_scenario(&scenario).await;

    assert!(!result.success);
    assert!(!body_ran.load(Ordering::SeqCst), "body must not run");
    assert_eq!(log.lock().clone(), vec!["setup:base", "teardown:base"]);
}

#[tokio::test]
async fn teardown_error_cannot_flip_a_passing_scenario() {
    let mut registry = FixtureRegistry::new();
    registry
        .register("doomed", &[], |_ctx| async {
            Ok(FixtureOutput::new(()).with_teardown(|| async {
                Err(Error::Driver("logout button missing".to_string()))
            }))
        })
        .unwrap();

    let sink = Arc::new(RecordingSink::default());
    let runner = runner_with(registry, SuiteConfig::default(), sink.clone());
    let scenario = Scenario::new("green")
        .fixtures(&["doomed"])
        .run(|_ctx| async { Ok(()) });

    let result = runner.run_scenario(&scenario).await;
    assert!(result.success, "teardown failures must not fail the scenario");
    assert!(result.error.is_none());
    assert_eq!(result.teardown_errors.len(), 1);

    let annotations = sink.annotations.lock();
    assert_eq!(annotations.len(), 1);
    assert!(annotations[0].contains("doomed"));
}

#[tokio::test]
async fn teardown_error_keeps_the_original_failure() {
    let mut registry = FixtureRegistry::new();
    registry
        .register("doomed", &[], |_ctx| async {
            Ok(FixtureOutput::new(()).with_teardown(|| async {
                Err(Error::Driver("cleanup failed".to_string()))
            }))
        })
        .unwrap();

    let runner = runner_with(registry, SuiteConfig::default(), Arc::new(NullReporter));
    let scenario = Scenario::new("red")
        .fixtures(&["doomed"])
        .run(|_ctx| async { Err(Error::Assertion("wrong price".to_string())) });

    let result = runner.run_scenario(&scenario).await;
    assert!(!result.success);
    assert!(
        result.error.as_deref().unwrap_or("").contains("wrong price"),
        "teardown errors must not mask the body error"
    );
}

#[tokio::test]
async fn a_slow_scenario_hits_the_deadline_and_still_tears_down() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    logged_fixture(&mut registry, "session", &log);

    let config = SuiteConfig {
        scenario_timeout_ms: 50,
        ..Default::default()
    };
    let runner = runner_with(registry, config, Arc::new(NullReporter));
    let scenario = Scenario::new("sleepy").fixtures(&["session"]).run(|_ctx| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    });

    let result = runner.run_scenario(&scenario).await;
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or("").contains("timed out"));
    assert_eq!(
        log.lock().clone(),
        vec!["setup:session", "teardown:session"]
    );
}

#[tokio::test]
async fn a_flaky_scenario_passes_within_the_retry_budget() {
    let registry = FixtureRegistry::new();
    let config = SuiteConfig {
        retries: 1,
        ..Default::default()
    };
    let runner = runner_with(registry, config, Arc::new(NullReporter));

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let scenario = Scenario::new("flaky").run(move |_ctx| {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Driver("transient".to_string()))
            } else {
                Ok(())
            }
        }
    });

    let result = runner.run_scenario(&scenario).await;
    assert!(result.success);
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn the_suite_continues_past_failures() {
    let registry = FixtureRegistry::new();
    let runner = runner_with(registry, SuiteConfig::default(), Arc::new(NullReporter));

    let scenarios = vec![
        Scenario::new("first").run(|_ctx| async { Ok(()) }),
        Scenario::new("second").run(|_ctx| async {
            Err(Error::Assertion("nope".to_string()))
        }),
        Scenario::new("third").run(|_ctx| async { Ok(()) }),
    ];

    let suite = runner.run(scenarios).await;
    assert_eq!(suite.total, 3);
    assert_eq!(suite.passed, 2);
    assert_eq!(suite.failed, 1);
    let names: Vec<&str> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn a_cyclic_registry_is_rejected_before_any_scenario() {
    let mut registry = FixtureRegistry::new();
    registry
        .register("a", &["b"], |_ctx| async { Ok(FixtureOutput::new(())) })
        .unwrap();
    registry
        .register("b", &["a"], |_ctx| async { Ok(FixtureOutput::new(())) })
        .unwrap();

    let factory = Arc::new(MockDriverFactory::shared(Arc::new(MockDriver::new())));
    let err = SuiteRunner::new(
        registry,
        SuiteConfig::default(),
        CredentialStore::builtin(),
        Arc::new(NullReporter),
        factory,
    )
    .unwrap_err();

    assert!(matches!(err, Error::DependencyCycle(_)));
}
