//! Storefront reachability probe
//!
//! The suite targets a deployed storefront; before spending browser time we
//! poll its base URL until it answers, and abort the whole run if it never
//! does.

use std::time::Duration;

use tracing::{info, warn};

use storecheck_harness::{Error, Result};

/// Poll the storefront until it responds with a success status
pub async fn wait_for_storefront(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| Error::Unreachable(format!("{base_url}: {e}")))?;

    let start = std::time::Instant::now();
    let mut attempts = 0usize;

    while start.elapsed() < timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("storefront reachable at {base_url}");
                return Ok(());
            }
            Ok(resp) => {
                warn!("storefront returned {} on probe", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("waiting for storefront at {base_url}...");
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("probe error: {e}");
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    Err(Error::Unreachable(format!(
        "{base_url} (after {attempts} attempt(s))"
    )))
}
