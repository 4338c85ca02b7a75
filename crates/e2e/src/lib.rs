//! storecheck E2E suite
//!
//! The browser-facing half of the suite:
//! - A Playwright bridge: one long-lived `node` subprocess speaking
//!   newline-delimited JSON, handing out an isolated browser context per
//!   scenario
//! - Visual regression with baseline screenshots
//! - The storefront fixture providers (logged-in page, cart with items,
//!   checkout page, ...) registered into the harness
//! - The scenario library (login, products, shopping, checkout, visual,
//!   performance, network)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 storecheck-e2e                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  scenarios::suite()        -> Vec<Scenario>                 │
//! │  fixtures::register_all()  -> FixtureRegistry               │
//! │  bridge::PlaywrightFactory -> DriverFactory                 │
//! │       └── node bridge.js  (stdin/stdout JSON lines)         │
//! │  visual::VisualTester      -> baseline comparison           │
//! │  probe::wait_for_storefront-> reachability gate             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod fixtures;
pub mod pages;
pub mod probe;
pub mod scenarios;
pub mod visual;

pub use bridge::{BrowserKind, PlaywrightFactory};
pub use fixtures::register_all;
pub use visual::{VisualDiff, VisualTester};
