//! Storefront fixture providers
//!
//! Every "page in state X" setup the scenarios need, registered as named
//! providers over the harness. Page-state fixtures share one authenticated
//! context per scenario through the resolver's memoization: `cart_with_items`
//! and `checkout_page` both build on `logged_in_page`, so requesting both in
//! one scenario logs in exactly once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use storecheck_harness::{
    CredentialStore, Driver, Error, FixtureOutput, FixtureRegistry, ReportSink, Result,
};

use crate::pages::{self, sel, urls, Page};
use crate::visual::VisualTester;

/// Role-parametrized login helper; validates the role tag before any
/// navigation happens
pub struct LoginAs {
    driver: Arc<dyn Driver>,
    credentials: Arc<CredentialStore>,
    reporter: Arc<dyn ReportSink>,
    scenario: String,
}

impl LoginAs {
    /// Drive the login sequence as the given role. Unknown roles fail here,
    /// with zero side effects. No post-login state is asserted: rejected
    /// logins (e.g. the locked-out account) leave the error banner up for
    /// the scenario to inspect.
    pub async fn login(&self, role: &str) -> Result<()> {
        let credentials = self.credentials.lookup(role)?.clone();

        let step = format!("login as {role} user");
        self.reporter.step_started(&self.scenario, &step);
        let result = pages::submit_login(self.driver.as_ref(), &credentials).await;
        self.reporter
            .step_finished(&self.scenario, &step, result.is_ok());
        result
    }
}

/// Opens product detail pages by catalog index
pub struct ProductDetails {
    driver: Arc<dyn Driver>,
}

impl ProductDetails {
    /// Click through to the detail page of the `index`-th product
    pub async fn open(&self, index: usize) -> Result<()> {
        if !self.driver.current_url().await?.contains("inventory.html") {
            self.driver.navigate("/inventory.html").await?;
        }

        let available = self.driver.count(sel::ITEM_NAME).await?;
        if index >= available {
            return Err(Error::Assertion(format!(
                "product index {index} out of range (only {available} products available)"
            )));
        }

        self.driver.click(&pages::nth(sel::ITEM_NAME, index)).await?;
        self.driver.wait_for_url(urls::ITEM).await
    }
}

/// Adds catalog items to the cart in bulk
pub struct CartLoader {
    driver: Arc<dyn Driver>,
}

impl CartLoader {
    /// Add up to `count` items (bounded by the catalog size) and verify the
    /// cart badge. Returns how many were actually added.
    pub async fn add(&self, count: usize) -> Result<usize> {
        let available = self.driver.count(sel::ADD_ANY).await?;
        let adding = count.min(available);

        // Each click turns an add button into a remove button, so the first
        // remaining add button is always the right target.
        for _ in 0..adding {
            self.driver.click(&pages::nth(sel::ADD_ANY, 0)).await?;
        }

        let badge = self.driver.text(sel::CART_BADGE).await?;
        if badge != adding.to_string() {
            return Err(Error::Assertion(format!(
                "cart badge shows '{badge}' after adding {adding} item(s)"
            )));
        }
        Ok(adding)
    }
}

/// Wall-clock measurement of driver interactions, recorded as report
/// parameters
pub struct Metrics {
    driver: Arc<dyn Driver>,
    reporter: Arc<dyn ReportSink>,
    scenario: String,
}

impl Metrics {
    /// Time a future and record its duration as a report parameter
    pub async fn measure<T, Fut>(&self, name: &str, fut: Fut) -> Result<(T, Duration)>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        let step = format!("measuring: {name}");
        self.reporter.step_started(&self.scenario, &step);

        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed();

        self.reporter
            .step_finished(&self.scenario, &step, result.is_ok());
        self.reporter.parameter(
            &self.scenario,
            &format!("{name} duration (ms)"),
            &elapsed.as_millis().to_string(),
        );

        result.map(|value| (value, elapsed))
    }

    /// Capture the page's navigation timing entry and record each metric as
    /// a report parameter
    pub async fn navigation_timing(&self) -> Result<Vec<(String, f64)>> {
        let value = self.driver.evaluate(pages::NAVIGATION_TIMING_JS).await?;
        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::Driver(format!(
                    "navigation timing returned {other}"
                )))
            }
        };

        let mut timings: Vec<(String, f64)> = object
            .into_iter()
            .filter_map(|(key, v)| v.as_f64().map(|ms| (key, ms)))
            .collect();
        timings.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, ms) in &timings {
            self.reporter.parameter(
                &self.scenario,
                &format!("navigation timing - {key} (ms)"),
                &format!("{ms:.0}"),
            );
        }
        Ok(timings)
    }
}

/// Register every storefront provider into the registry
pub fn register_all(registry: &mut FixtureRegistry) -> Result<()> {
    registry.register("home_page", &[], |ctx| async move {
        ctx.driver.navigate("/").await?;
        Ok(FixtureOutput::new(Page {
            driver: ctx.driver.clone(),
        }))
    })?;

    registry.register("logged_in_page", &["home_page"], |ctx| async move {
        let page = ctx.dep::<Page>("home_page")?;
        let credentials = ctx.credentials.lookup("standard")?.clone();
        let driver = page.driver.clone();

        ctx.step("login as standard user", async {
            driver.fill(sel::USERNAME, &credentials.username).await?;
            driver.fill(sel::PASSWORD, &credentials.password).await?;
            driver.click(sel::LOGIN_BUTTON).await?;
            driver.wait_for_url(urls::INVENTORY).await
        })
        .await?;

        if let Ok(shot) = driver.screenshot(None).await {
            ctx.attach("page after login", "image/png", &shot);
        }

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(Page { driver })
            .with_teardown(move || async move {
                // Best-effort logout; only meaningful while still on a
                // catalog page
                if teardown_driver.current_url().await?.contains("inventory") {
                    teardown_driver.click(sel::BURGER_MENU).await?;
                    teardown_driver.click(sel::LOGOUT_LINK).await?;
                }
                Ok(())
            }))
    })?;

    registry.register("cart_with_items", &["logged_in_page"], |ctx| async move {
        let page = ctx.dep::<Page>("logged_in_page")?;
        let driver = page.driver.clone();

        ctx.step("add products to cart", async {
            driver.click(sel::ADD_BACKPACK).await?;
            driver.click(sel::ADD_BIKE_LIGHT).await?;
            driver.click(sel::CART_LINK).await?;
            driver.wait_for_url(urls::CART).await
        })
        .await?;

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(Page { driver })
            .with_teardown(move || async move {
                if teardown_driver.current_url().await?.contains("cart") {
                    teardown_driver.click(sel::REMOVE_BACKPACK).await?;
                    teardown_driver.click(sel::REMOVE_BIKE_LIGHT).await?;
                }
                Ok(())
            }))
    })?;

    registry.register("checkout_page", &["logged_in_page"], |ctx| async move {
        let page = ctx.dep::<Page>("logged_in_page")?;
        let driver = page.driver.clone();

        ctx.step("navigate to checkout page", async {
            driver.click(sel::ADD_BACKPACK).await?;
            driver.click(sel::CART_LINK).await?;
            driver.click(sel::CHECKOUT).await?;
            driver.wait_for_url(urls::CHECKOUT_STEP_ONE).await
        })
        .await?;

        if let Ok(shot) = driver.screenshot(None).await {
            ctx.attach("checkout page initial state", "image/png", &shot);
        }

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(Page { driver })
            .with_teardown(move || async move {
                // Abandon the checkout flow if the scenario left us in it
                if teardown_driver.current_url().await?.contains("checkout") {
                    teardown_driver.navigate("/inventory.html").await?;
                }
                Ok(())
            }))
    })?;

    registry.register("order_complete_page", &["logged_in_page"], |ctx| async move {
        let page = ctx.dep::<Page>("logged_in_page")?;
        let driver = page.driver.clone();

        ctx.step("complete full order flow", async {
            driver.click(sel::ADD_BACKPACK).await?;
            driver.click(sel::CART_LINK).await?;
            driver.click(sel::CHECKOUT).await?;
            driver.fill(sel::FIRST_NAME, "Test").await?;
            driver.fill(sel::LAST_NAME, "User").await?;
            driver.fill(sel::POSTAL_CODE, "12345").await?;
            driver.click(sel::CONTINUE).await?;
            driver.click(sel::FINISH).await?;
            driver.wait_for_url(urls::CHECKOUT_COMPLETE).await
        })
        .await?;

        if let Ok(shot) = driver.screenshot(None).await {
            ctx.attach("order confirmation page", "image/png", &shot);
        }

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(Page { driver })
            .with_teardown(move || async move {
                if teardown_driver
                    .current_url()
                    .await?
                    .contains("checkout-complete")
                {
                    teardown_driver.click(sel::BACK_TO_PRODUCTS).await?;
                }
                Ok(())
            }))
    })?;

    registry.register("product_details", &["logged_in_page"], |ctx| async move {
        let page = ctx.dep::<Page>("logged_in_page")?;
        let driver = page.driver.clone();

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(ProductDetails { driver })
            .with_teardown(move || async move {
                if teardown_driver
                    .current_url()
                    .await?
                    .contains("inventory-item")
                {
                    teardown_driver.click(sel::BACK_TO_PRODUCTS).await?;
                }
                Ok(())
            }))
    })?;

    registry.register("cart_loader", &["logged_in_page"], |ctx| async move {
        let page = ctx.dep::<Page>("logged_in_page")?;
        let driver = page.driver.clone();

        let teardown_driver = driver.clone();
        Ok(FixtureOutput::new(CartLoader { driver })
            .with_teardown(move || async move {
                // Empty the cart and return to the catalog
                teardown_driver.click(sel::CART_LINK).await?;
                let leftover = teardown_driver.count(sel::CART_ITEM).await?;
                for _ in 0..leftover {
                    teardown_driver
                        .click(&pages::nth(sel::REMOVE_ANY, 0))
                        .await?;
                }
                teardown_driver.navigate("/inventory.html").await
            }))
    })?;

    registry.register("login_as", &[], |ctx| async move {
        debug!(scenario = %ctx.scenario, "providing role-parametrized login");
        Ok(FixtureOutput::new(LoginAs {
            driver: ctx.driver.clone(),
            credentials: ctx.credentials.clone(),
            reporter: ctx.reporter.clone(),
            scenario: ctx.scenario.clone(),
        }))
    })?;

    registry.register("metrics", &[], |ctx| async move {
        Ok(FixtureOutput::new(Metrics {
            driver: ctx.driver.clone(),
            reporter: ctx.reporter.clone(),
            scenario: ctx.scenario.clone(),
        }))
    })?;

    registry.register("visual", &[], |ctx| async move {
        let tester = VisualTester::from_config(&ctx.config)?;
        Ok(FixtureOutput::new(tester))
    })?;

    Ok(())
}
