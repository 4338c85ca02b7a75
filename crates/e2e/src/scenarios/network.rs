//! Degraded-network behavior via request interception

use storecheck_harness::{Error, RouteAction, Scenario};

use crate::fixtures::{LoginAs, Metrics};
use crate::pages::{urls, Page, BROKEN_IMAGES_JS};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("login-under-slow-network")
            .epic("Advanced E-commerce Tests")
            .feature("Error Handling")
            .fixtures(&["login_as", "metrics"])
            .run(|ctx| async move {
                let login = ctx.fixture::<LoginAs>("login_as")?;
                let metrics = ctx.fixture::<Metrics>("metrics")?;
                let driver = ctx.driver();

                driver.route("**/*", RouteAction::Delay(500)).await?;
                let outcome = metrics
                    .measure("login with 500ms request delay", async {
                        login.login("standard").await?;
                        driver.wait_for_url(urls::INVENTORY).await
                    })
                    .await;
                // Lift the delay before surfacing any failure
                driver.unroute("**/*").await?;
                outcome?;
                Ok(())
            }),
        Scenario::new("catalog-with-blocked-images")
            .epic("Advanced E-commerce Tests")
            .feature("Error Handling")
            .fixtures(&["logged_in_page"])
            .run(|ctx| async move {
                let page = ctx.fixture::<Page>("logged_in_page")?;
                let driver = &page.driver;

                driver.route("**/*.jpg", RouteAction::Abort).await?;

                let broken = ctx
                    .step("reload the catalog with image requests failing", async {
                        driver.navigate("/inventory.html").await?;
                        let broken = driver.evaluate(BROKEN_IMAGES_JS).await?;
                        Ok(broken.as_u64().unwrap_or(0))
                    })
                    .await?;

                ctx.parameter("broken images count", &broken.to_string());
                ctx.attach_screenshot("page with blocked images").await;
                driver.unroute("**/*.jpg").await?;

                // The catalog inlines its product art, so blocked fetches
                // must not leave broken <img> elements behind
                if broken != 0 {
                    return Err(Error::Assertion(format!(
                        "{broken} image(s) broke under blocked requests"
                    )));
                }
                Ok(())
            }),
    ]
}
