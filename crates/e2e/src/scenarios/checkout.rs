//! Checkout form validation and order summary arithmetic

use storecheck_harness::{check, Scenario};

use crate::pages::{self, sel, urls, Page};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("checkout-requires-every-field")
            .epic("E-commerce")
            .feature("Checkout Validation")
            .fixtures(&["checkout_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("checkout_page")?;
                let driver = &page.driver;

                ctx.step("submit empty form", async {
                    driver.click(sel::CONTINUE).await?;
                    check::expect_visible(driver.as_ref(), sel::ERROR_BANNER).await?;
                    check::expect_text_contains(
                        driver.as_ref(),
                        sel::ERROR_BANNER,
                        "First Name is required",
                    )
                    .await
                })
                .await?;
                ctx.attach_screenshot("empty form validation").await;

                ctx.step("fill only first name", async {
                    driver.fill(sel::FIRST_NAME, "John").await?;
                    driver.click(sel::CONTINUE).await?;
                    check::expect_text_contains(
                        driver.as_ref(),
                        sel::ERROR_BANNER,
                        "Last Name is required",
                    )
                    .await
                })
                .await?;
                ctx.attach_screenshot("partial form validation").await;

                ctx.step("fill first and last name", async {
                    driver.fill(sel::LAST_NAME, "Smith").await?;
                    driver.click(sel::CONTINUE).await?;
                    check::expect_text_contains(
                        driver.as_ref(),
                        sel::ERROR_BANNER,
                        "Postal Code is required",
                    )
                    .await
                })
                .await?;
                ctx.attach_screenshot("missing postal code validation").await;
                Ok(())
            }),
        Scenario::new("checkout-accepts-valid-data")
            .epic("E-commerce")
            .feature("Checkout Validation")
            .fixtures(&["checkout_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("checkout_page")?;
                let driver = &page.driver;

                ctx.step("fill all required fields", async {
                    driver.fill(sel::FIRST_NAME, "John").await?;
                    driver.fill(sel::LAST_NAME, "Smith").await?;
                    driver.fill(sel::POSTAL_CODE, "12345").await
                })
                .await?;
                ctx.attach_screenshot("completed form").await;

                ctx.step("submit complete form", async {
                    driver.click(sel::CONTINUE).await?;
                    check::expect_url(driver.as_ref(), urls::CHECKOUT_STEP_TWO).await
                })
                .await?;
                ctx.attach_screenshot("order summary page").await;
                Ok(())
            }),
        Scenario::new("checkout-summary-tax-and-total")
            .epic("E-commerce")
            .feature("Checkout Variations")
            .fixtures(&["checkout_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("checkout_page")?;
                let driver = &page.driver;

                ctx.step("complete form with long name and address", async {
                    driver.fill(sel::FIRST_NAME, "Johnathon Alexander").await?;
                    driver.fill(sel::LAST_NAME, "Smith-Johnson").await?;
                    driver.fill(sel::POSTAL_CODE, "90210-1234").await?;
                    driver.click(sel::CONTINUE).await?;
                    check::expect_url(driver.as_ref(), urls::CHECKOUT_STEP_TWO).await
                })
                .await?;
                ctx.attach_screenshot("checkout form with long inputs").await;

                ctx.step("verify order summary arithmetic", async {
                    let subtotal =
                        pages::parse_price(&driver.text(sel::SUMMARY_SUBTOTAL).await?)?;
                    let tax = pages::parse_price(&driver.text(sel::SUMMARY_TAX).await?)?;
                    let total = pages::parse_price(&driver.text(sel::SUMMARY_TOTAL).await?)?;

                    // The storefront applies roughly 8% tax
                    check::expect_close("tax", tax, subtotal * 0.08, 0.05)?;
                    check::expect_close("total", total, subtotal + tax, 0.05)?;

                    ctx.parameter("subtotal", &format!("${subtotal:.2}"));
                    ctx.parameter(
                        "tax",
                        &format!("${tax:.2} ({:.2}%)", tax / subtotal * 100.0),
                    );
                    ctx.parameter("total", &format!("${total:.2}"));
                    Ok(())
                })
                .await
            }),
    ]
}
