//! storecheck fixture harness
//!
//! This crate provides the composition core for the storefront E2E suite:
//! - Named fixture providers with a setup/teardown lifecycle
//! - A statically validated dependency graph between providers
//! - Per-scenario memoizing resolution with reverse-order teardown
//! - A scenario runner with deadlines, retries and worker parallelism
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SuiteRunner                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  per scenario:                                               │
//! │    DriverFactory::create()      -> isolated browser context  │
//! │    ResolutionScope::resolve()   -> memoized depth-first DFS  │
//! │    Scenario body                -> steps, params, attachments│
//! │    ResolutionScope::teardown()  -> strict reverse order      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  FixtureRegistry (validated acyclic before any scenario)     │
//! │    name -> { dependencies, setup, teardown-at-setup-time }   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  External seams                                              │
//! │    Driver      -> browser automation engine                  │
//! │    ReportSink  -> structured report (steps/params/attachments)│
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod check;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod graph;
pub mod mock;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod scenario;

pub use config::{SuiteConfig, Viewport, VisualTolerance};
pub use credentials::{CredentialStore, Credentials};
pub use driver::{Driver, DriverFactory, RouteAction};
pub use error::{Error, Result};
pub use fixture::{FixtureCtx, FixtureOutput, FixtureRegistry, FixtureValue};
pub use report::{JsonReporter, Label, NullReporter, ReportSink};
pub use resolver::ResolutionScope;
pub use runner::{ScenarioResult, SuiteResult, SuiteRunner};
pub use scenario::{Scenario, ScenarioCtx};

/// Harness version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
