//! Resolution and teardown ordering properties
//!
//! Exercises the memoizing depth-first resolver directly: shared instances,
//! reverse-order teardown, and isolation of teardown failures.

use std::sync::Arc;

use parking_lot::Mutex;

use storecheck_harness::mock::MockDriver;
use storecheck_harness::resolver::{ResolutionScope, ScenarioEnv};
use storecheck_harness::{
    CredentialStore, Error, FixtureOutput, FixtureRegistry, NullReporter, SuiteConfig,
};

type EventLog = Arc<Mutex<Vec<String>>>;

fn test_env() -> ScenarioEnv {
    ScenarioEnv {
        scenario: "test".to_string(),
        driver: Arc::new(MockDriver::new()),
        reporter: Arc::new(NullReporter),
        credentials: Arc::new(CredentialStore::builtin()),
        config: Arc::new(SuiteConfig::default()),
    }
}

/// Register a fixture that logs its setup and teardown and yields its own
/// name as value
fn register_logged(
    registry: &mut FixtureRegistry,
    name: &'static str,
    deps: &[&str],
    log: &EventLog,
) {
    let log = log.clone();
    registry
        .register(name, deps, move |_ctx| {
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
async fn repeated_resolution_shares_one_instance() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    register_logged(&mut registry, "auth", &[], &log);
    register_logged(&mut registry, "cart", &["auth"], &log);

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());

    // Resolving the dependent first, then the dependency directly, must not
    // re-run setup.
    let via_cart = scope.resolve("cart").await.unwrap();
    let direct = scope.resolve("auth").await.unwrap();
    let again = scope.resolve("auth").await.unwrap();

    assert!(Arc::ptr_eq(&direct, &again));
    assert_eq!(
        log.lock().iter().filter(|e| *e == "setup:auth").count(),
        1,
        "auth setup must run exactly once"
    );
    drop(via_cart);

    let typed_a = scope.get::<String>("auth").unwrap();
    let typed_b = scope.get::<String>("auth").unwrap();
    assert!(Arc::ptr_eq(&typed_a, &typed_b));
}

#[tokio::test]
async fn dependencies_resolve_left_to_right() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    register_logged(&mut registry, "left", &[], &log);
    register_logged(&mut registry, "right", &[], &log);
    register_logged(&mut registry, "combo", &["left", "right"], &log);

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    scope.resolve("combo").await.unwrap();

    assert_eq!(
        log.lock().clone(),
        vec!["setup:left", "setup:right", "setup:combo"]
    );
}

#[tokio::test]
async fn teardown_runs_in_reverse_resolution_order() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    register_logged(&mut registry, "home", &[], &log);
    register_logged(&mut registry, "auth", &["home"], &log);
    register_logged(&mut registry, "cart", &["auth"], &log);
    register_logged(&mut registry, "unused", &[], &log);

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    scope.resolve("cart").await.unwrap();

    let failures = scope.teardown_all().await;
    assert!(failures.is_empty());

    assert_eq!(
        log.lock().clone(),
        vec![
            "setup:home",
            "setup:auth",
            "setup:cart",
            "teardown:cart",
            "teardown:auth",
            "teardown:home",
        ]
    );
    // "unused" was never requested: no setup, no teardown.
    assert!(log.lock().iter().all(|e| !e.contains("unused")));
}

#[tokio::test]
async fn failing_teardown_does_not_block_the_rest() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    register_logged(&mut registry, "base", &[], &log);

    let fail_log = log.clone();
    registry
        .register("flaky", &["base"], move |_ctx| {
            let log = fail_log.clone();
            async move {
                log.lock().push("setup:flaky".to_string());
                let teardown_log = log.clone();
                Ok(
                    FixtureOutput::new("flaky".to_string()).with_teardown(move || async move {
                        teardown_log.lock().push("teardown:flaky".to_string());
                        Err(Error::Driver("session already gone".to_string()))
                    }),
                )
            }
        })
        .unwrap();
    register_logged(&mut registry, "top", &["flaky"], &log);

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    scope.resolve("top").await.unwrap();

    let failures = scope.teardown_all().await;
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0],
        Error::Teardown { fixture, .. } if fixture == "flaky"
    ));

    // Both neighbors still tore down, in order.
    assert_eq!(
        log.lock().clone(),
        vec![
            "setup:base",
            "setup:flaky",
            "setup:top",
            "teardown:top",
            "teardown:flaky",
            "teardown:base",
        ]
    );
}

#[tokio::test]
async fn setup_error_leaves_earlier_fixtures_torn_down() {
    let log: EventLog = Default::default();
    let mut registry = FixtureRegistry::new();
    register_logged(&mut registry, "base", &[], &log);

    registry
        .register("broken", &["base"], |_ctx| async {
            Err::<FixtureOutput, _>(Error::Driver("element never appeared".to_string()))
        })
        .unwrap();

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    let err = scope.resolve("broken").await.unwrap_err();
    assert!(matches!(err, Error::Driver(_)));

    let failures = scope.teardown_all().await;
    assert!(failures.is_empty());
    assert_eq!(
        log.lock().clone(),
        vec!["setup:base", "teardown:base"],
        "the resolved dependency still tears down"
    );
}

#[tokio::test]
async fn unknown_fixture_is_an_error() {
    let registry = FixtureRegistry::new();
    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    let err = scope.resolve("no_such_fixture").await.unwrap_err();
    assert!(matches!(err, Error::UnknownFixture(name) if name == "no_such_fixture"));
}

#[tokio::test]
async fn typed_getter_rejects_a_wrong_type() {
    let mut registry = FixtureRegistry::new();
    registry
        .register("number", &[], |_ctx| async { Ok(FixtureOutput::new(7u32)) })
        .unwrap();

    let mut scope = ResolutionScope::new(Arc::new(registry), test_env());
    scope.resolve("number").await.unwrap();

    assert!(scope.get::<u32>("number").is_ok());
    assert!(matches!(
        scope.get::<String>("number").unwrap_err(),
        Error::FixtureType { .. }
    ));
}
