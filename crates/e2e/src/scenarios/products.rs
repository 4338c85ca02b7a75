//! Product filtering, sorting and detail pages

use storecheck_harness::{check, Error, Scenario};

use crate::fixtures::ProductDetails;
use crate::pages::{self, sel, Page};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("sort-products-by-price-ascending")
            .epic("E-commerce")
            .feature("Product Navigation")
            .fixtures(&["logged_in_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("logged_in_page")?;

                ctx.step("apply price sorting (low to high)", async {
                    page.driver.select(sel::SORT_SELECT, "lohi").await
                })
                .await?;
                ctx.attach_screenshot("products sorted by price").await;

                let prices = ctx
                    .step("verify sorting order", async {
                        let labels = page.driver.texts(sel::ITEM_PRICE).await?;
                        let mut prices = Vec::with_capacity(labels.len());
                        for label in &labels {
                            prices.push(pages::parse_price(label)?);
                        }
                        for pair in prices.windows(2) {
                            if pair[0] > pair[1] {
                                return Err(Error::Assertion(format!(
                                    "prices not ascending: {} listed before {}",
                                    pair[0], pair[1]
                                )));
                            }
                        }
                        Ok(prices)
                    })
                    .await?;

                if let (Some(first), Some(last)) = (prices.first(), prices.last()) {
                    ctx.parameter("price range", &format!("${first} - ${last}"));
                }
                Ok(())
            }),
        Scenario::new("view-product-details")
            .epic("E-commerce")
            .feature("Product Details")
            .fixtures(&["product_details"])
            .run(|ctx| async move {
                let details = ctx.fixture::<ProductDetails>("product_details")?;
                details.open(0).await?;

                ctx.step("verify product details page", async {
                    let driver = ctx.driver();
                    check::expect_visible(driver.as_ref(), sel::DETAILS_NAME).await?;
                    check::expect_visible(driver.as_ref(), sel::DETAILS_DESC).await?;
                    check::expect_visible(driver.as_ref(), sel::DETAILS_PRICE).await?;
                    check::expect_visible(driver.as_ref(), sel::DETAILS_IMAGE).await
                })
                .await?;

                let name = ctx.driver().text(sel::DETAILS_NAME).await?;
                let price = ctx.driver().text(sel::DETAILS_PRICE).await?;
                ctx.parameter("product", &name);
                ctx.parameter("price", &price);
                Ok(())
            }),
        Scenario::new("product-details-cart-toggle")
            .epic("E-commerce")
            .feature("Product Details")
            .fixtures(&["product_details"])
            .run(|ctx| async move {
                let details = ctx.fixture::<ProductDetails>("product_details")?;
                details.open(0).await?;

                ctx.step("add and remove from the details page", async {
                    let driver = ctx.driver();
                    driver.click(sel::ADD_ANY).await?;
                    check::expect_visible(driver.as_ref(), sel::CART_BADGE).await?;
                    driver.click(sel::REMOVE_ANY).await?;
                    check::expect_hidden(driver.as_ref(), sel::CART_BADGE).await
                })
                .await
            }),
        Scenario::new("navigate-between-product-details")
            .epic("E-commerce")
            .feature("Product Navigation")
            .fixtures(&["product_details"])
            .run(|ctx| async move {
                let details = ctx.fixture::<ProductDetails>("product_details")?;
                details.open(0).await?;
                let first = ctx.driver().text(sel::DETAILS_NAME).await?;

                let second = ctx
                    .step("return to the list and view the second product", async {
                        let driver = ctx.driver();
                        driver.click(sel::BACK_TO_PRODUCTS).await?;
                        driver.click(&pages::nth(sel::ITEM_NAME, 1)).await?;
                        let second = driver.text(sel::DETAILS_NAME).await?;
                        if second == first {
                            return Err(Error::Assertion(format!(
                                "both detail pages show '{second}'"
                            )));
                        }
                        Ok(second)
                    })
                    .await?;

                ctx.parameter("first product", &first);
                ctx.parameter("second product", &second);
                Ok(())
            }),
    ]
}
