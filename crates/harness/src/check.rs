//! Assertion helpers over the driver seam
//!
//! These return [`Error::Assertion`] instead of panicking, so a failed
//! expectation fails its own scenario and nothing else.

use crate::driver::Driver;
use crate::error::{Error, Result};

/// Expect the current URL to match a regex pattern (waits per the driver)
pub async fn expect_url(driver: &dyn Driver, pattern: &str) -> Result<()> {
    driver
        .wait_for_url(pattern)
        .await
        .map_err(|e| Error::Assertion(format!("expected url matching '{pattern}': {e}")))
}

/// Expect the first match's text to equal `expected` exactly
pub async fn expect_text(driver: &dyn Driver, selector: &str, expected: &str) -> Result<()> {
    let actual = driver.text(selector).await?;
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Assertion(format!(
            "'{selector}' has text '{actual}', expected '{expected}'"
        )))
    }
}

/// Expect the first match's text to contain `needle`
pub async fn expect_text_contains(
    driver: &dyn Driver,
    selector: &str,
    needle: &str,
) -> Result<()> {
    let actual = driver.text(selector).await?;
    if actual.contains(needle) {
        Ok(())
    } else {
        Err(Error::Assertion(format!(
            "'{selector}' has text '{actual}', expected it to contain '{needle}'"
        )))
    }
}

/// Expect exactly `expected` elements to match the selector
pub async fn expect_count(driver: &dyn Driver, selector: &str, expected: usize) -> Result<()> {
    let actual = driver.count(selector).await?;
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Assertion(format!(
            "'{selector}' matches {actual} element(s), expected {expected}"
        )))
    }
}

pub async fn expect_visible(driver: &dyn Driver, selector: &str) -> Result<()> {
    if driver.is_visible(selector).await? {
        Ok(())
    } else {
        Err(Error::Assertion(format!("'{selector}' is not visible")))
    }
}

pub async fn expect_hidden(driver: &dyn Driver, selector: &str) -> Result<()> {
    if driver.is_visible(selector).await? {
        Err(Error::Assertion(format!("'{selector}' is still visible")))
    } else {
        Ok(())
    }
}

/// Expect `actual` to be within `tolerance` of `expected`
pub fn expect_close(name: &str, actual: f64, expected: f64, tolerance: f64) -> Result<()> {
    if (actual - expected).abs() <= tolerance {
        Ok(())
    } else {
        Err(Error::Assertion(format!(
            "{name}: {actual} not within {tolerance} of {expected}"
        )))
    }
}
