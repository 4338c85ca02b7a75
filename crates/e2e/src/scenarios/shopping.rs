//! Shopping flow: checkout completion and cart management

use storecheck_harness::{check, Scenario};

use crate::fixtures::CartLoader;
use crate::pages::{self, sel, Page};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("complete-checkout")
            .epic("E-commerce")
            .feature("Purchase Flow")
            .tag("smoke")
            .fixtures(&["order_complete_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("order_complete_page")?;

                ctx.step("verify order completion", async {
                    check::expect_text(
                        page.driver.as_ref(),
                        sel::COMPLETE_HEADER,
                        "Thank you for your order!",
                    )
                    .await
                })
                .await?;

                ctx.attach_screenshot("order confirmation").await;
                Ok(())
            }),
        Scenario::new("cart-add-and-remove")
            .epic("E-commerce")
            .feature("Cart Management")
            .fixtures(&["logged_in_page", "cart_loader"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("logged_in_page")?;
                let loader = ctx.fixture::<CartLoader>("cart_loader")?;

                ctx.step("add item to cart", async {
                    loader.add(1).await?;
                    check::expect_text(page.driver.as_ref(), sel::CART_BADGE, "1").await
                })
                .await?;

                ctx.step("remove items", async {
                    page.driver.click(sel::CART_LINK).await?;
                    page.driver.click(sel::REMOVE_BACKPACK).await?;
                    check::expect_hidden(page.driver.as_ref(), sel::CART_BADGE).await
                })
                .await?;

                ctx.attach_screenshot("cart after removing item").await;
                Ok(())
            }),
        Scenario::new("cart-holds-multiple-items")
            .epic("E-commerce")
            .feature("Cart Management")
            .fixtures(&["cart_loader"])
            .run(|ctx| async move {
                let loader = ctx.fixture::<CartLoader>("cart_loader")?;
                let added = loader.add(3).await?;

                ctx.step("verify cart contents and total", async {
                    let driver = ctx.driver();
                    driver.click(sel::CART_LINK).await?;
                    check::expect_count(driver.as_ref(), sel::CART_ITEM, added).await?;

                    let labels = driver.texts(sel::ITEM_PRICE).await?;
                    let mut total = 0.0;
                    for label in &labels {
                        total += pages::parse_price(label)?;
                    }
                    ctx.parameter("cart total", &format!("${total:.2}"));
                    Ok(())
                })
                .await?;

                ctx.attach_screenshot("cart with multiple items").await;
                Ok(())
            }),
    ]
}
