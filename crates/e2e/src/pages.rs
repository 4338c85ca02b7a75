//! Storefront page vocabulary: selectors, URL patterns and shared helpers

use std::sync::Arc;

use storecheck_harness::{Credentials, Driver, Error, Result};

/// CSS selectors for the storefront
pub mod sel {
    pub const USERNAME: &str = "#user-name";
    pub const PASSWORD: &str = "#password";
    pub const LOGIN_BUTTON: &str = "#login-button";
    pub const ERROR_BANNER: &str = "[data-test=\"error\"]";

    pub const TITLE: &str = ".title";
    pub const INVENTORY_ITEM: &str = ".inventory_item";
    pub const INVENTORY_LIST: &str = ".inventory_list";
    pub const ITEM_NAME: &str = ".inventory_item_name";
    pub const ITEM_PRICE: &str = ".inventory_item_price";
    pub const ITEM_IMAGE: &str = "img.inventory_item_img";
    pub const SORT_SELECT: &str = ".product_sort_container";

    pub const CART_LINK: &str = ".shopping_cart_link";
    pub const CART_BADGE: &str = ".shopping_cart_badge";
    pub const CART_ITEM: &str = ".cart_item";
    pub const ADD_BACKPACK: &str = "#add-to-cart-sauce-labs-backpack";
    pub const ADD_BIKE_LIGHT: &str = "#add-to-cart-sauce-labs-bike-light";
    pub const REMOVE_BACKPACK: &str = "#remove-sauce-labs-backpack";
    pub const REMOVE_BIKE_LIGHT: &str = "#remove-sauce-labs-bike-light";
    pub const ADD_ANY: &str = "[data-test^=\"add-to-cart\"]";
    pub const REMOVE_ANY: &str = "[data-test^=\"remove\"]";

    pub const CHECKOUT: &str = "#checkout";
    pub const FIRST_NAME: &str = "#first-name";
    pub const LAST_NAME: &str = "#last-name";
    pub const POSTAL_CODE: &str = "#postal-code";
    pub const CONTINUE: &str = "#continue";
    pub const FINISH: &str = "#finish";
    pub const COMPLETE_HEADER: &str = ".complete-header";
    pub const SUMMARY_SUBTOTAL: &str = ".summary_subtotal_label";
    pub const SUMMARY_TAX: &str = ".summary_tax_label";
    pub const SUMMARY_TOTAL: &str = ".summary_total_label";

    pub const DETAILS_NAME: &str = ".inventory_details_name";
    pub const DETAILS_DESC: &str = ".inventory_details_desc";
    pub const DETAILS_PRICE: &str = ".inventory_details_price";
    pub const DETAILS_IMAGE: &str = ".inventory_details_img";
    pub const BACK_TO_PRODUCTS: &str = "#back-to-products";

    pub const BURGER_MENU: &str = "#react-burger-menu-btn";
    pub const LOGOUT_LINK: &str = "#logout_sidebar_link";
}

/// URL regex patterns for the storefront
pub mod urls {
    pub const INVENTORY: &str = r"inventory\.html";
    pub const ITEM: &str = r"inventory-item\.html";
    pub const CART: &str = r"cart\.html";
    pub const CHECKOUT_STEP_ONE: &str = r"checkout-step-one\.html";
    pub const CHECKOUT_STEP_TWO: &str = r"checkout-step-two\.html";
    pub const CHECKOUT_COMPLETE: &str = r"checkout-complete\.html";
}

/// Counts inventory images that never finished loading
pub const BROKEN_IMAGES_JS: &str = "(() => Array.from(document.querySelectorAll('img.inventory_item_img')).filter((img) => !img.complete || img.naturalWidth === 0).length)()";

/// Reads the page's navigation timing entry as a flat object of millisecond
/// durations
pub const NAVIGATION_TIMING_JS: &str = "(() => { const t = performance.getEntriesByType('navigation')[0]; if (!t) return {}; return { dns: t.domainLookupEnd - t.domainLookupStart, connection: t.connectEnd - t.connectStart, ttfb: t.responseStart - t.requestStart, download: t.responseEnd - t.responseStart, dom_interactive: t.domInteractive - t.startTime, dom_complete: t.domComplete - t.startTime, load: t.loadEventEnd - t.startTime }; })()";

/// A browser page in some storefront state; the value most fixtures yield.
/// All consumers within one scenario share the same underlying context.
pub struct Page {
    pub driver: Arc<dyn Driver>,
}

/// The engine's n-th-match selector syntax
pub fn nth(selector: &str, index: usize) -> String {
    format!("{selector} >> nth={index}")
}

/// Submit the login form with the given credentials. Callers decide what to
/// wait for afterwards: successful logins redirect to the catalog, rejected
/// ones surface the error banner.
pub async fn submit_login(driver: &dyn Driver, credentials: &Credentials) -> Result<()> {
    driver.navigate("/").await?;
    driver.fill(sel::USERNAME, &credentials.username).await?;
    driver.fill(sel::PASSWORD, &credentials.password).await?;
    driver.click(sel::LOGIN_BUTTON).await
}

/// Parse a `$29.99`-style label into its numeric value
pub fn parse_price(text: &str) -> Result<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse()
        .map_err(|_| Error::Assertion(format!("unparseable price: '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("$29.99", 29.99)]
    #[test_case("Total: $43.18", 43.18)]
    #[test_case("Tax: $3.20", 3.20)]
    fn prices_parse(text: &str, expected: f64) {
        assert!((parse_price(text).unwrap() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn junk_prices_do_not_parse() {
        assert!(parse_price("free!").is_err());
    }

    #[test]
    fn nth_uses_engine_syntax() {
        assert_eq!(nth(".inventory_item_name", 1), ".inventory_item_name >> nth=1");
    }
}
