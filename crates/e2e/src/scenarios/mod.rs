//! The storefront scenario library

pub mod checkout;
pub mod login;
pub mod network;
pub mod performance;
pub mod products;
pub mod shopping;
pub mod visual;

use storecheck_harness::Scenario;

/// Every scenario in the suite
pub fn suite() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(login::scenarios());
    scenarios.extend(products::scenarios());
    scenarios.extend(shopping::scenarios());
    scenarios.extend(checkout::scenarios());
    scenarios.extend(visual::scenarios());
    scenarios.extend(performance::scenarios());
    scenarios.extend(network::scenarios());
    scenarios
}
