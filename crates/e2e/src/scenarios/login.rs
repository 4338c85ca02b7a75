//! Login functionality

use storecheck_harness::{check, Error, Scenario};

use crate::fixtures::LoginAs;
use crate::pages::{sel, urls, Page, BROKEN_IMAGES_JS};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("login-standard-user")
            .epic("Authentication")
            .feature("User Login")
            .tag("smoke")
            .fixtures(&["logged_in_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("logged_in_page")?;

                ctx.step("verify successful login", async {
                    check::expect_text(page.driver.as_ref(), sel::TITLE, "Products").await?;
                    check::expect_count(page.driver.as_ref(), sel::INVENTORY_ITEM, 6).await
                })
                .await?;

                ctx.attach_screenshot("products page").await;
                Ok(())
            }),
        Scenario::new("login-locked-user")
            .epic("Authentication")
            .feature("User Login")
            .tag("smoke")
            .fixtures(&["login_as"])
            .run(|ctx| async move {
                let login = ctx.fixture::<LoginAs>("login_as")?;
                login.login("locked").await?;

                ctx.step("verify lockout message", async {
                    check::expect_text_contains(
                        ctx.driver().as_ref(),
                        sel::ERROR_BANNER,
                        "Epic sadface: Sorry, this user has been locked out",
                    )
                    .await
                })
                .await?;

                ctx.attach_screenshot("login error").await;
                Ok(())
            }),
        Scenario::new("login-problem-user")
            .epic("Authentication")
            .feature("User Login")
            .fixtures(&["login_as"])
            .run(|ctx| async move {
                let login = ctx.fixture::<LoginAs>("login_as")?;
                login.login("problem").await?;

                ctx.step("verify problem user reaches the catalog", async {
                    check::expect_url(ctx.driver().as_ref(), urls::INVENTORY).await
                })
                .await?;

                // This account is known for broken product images
                let broken = ctx.driver().evaluate(BROKEN_IMAGES_JS).await?;
                let broken = broken.as_u64().unwrap_or(0);
                ctx.parameter("broken images count", &broken.to_string());
                if broken != 0 {
                    return Err(Error::Assertion(format!(
                        "{broken} product image(s) failed to load"
                    )));
                }

                ctx.attach_screenshot("problem user page").await;
                Ok(())
            }),
    ]
}
