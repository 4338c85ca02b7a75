//! Visual comparison against baseline screenshots

use storecheck_harness::{Error, Scenario, Viewport};

use crate::pages::sel;
use crate::visual::VisualTester;

/// Turn a comparison into a scenario outcome. A missing baseline is not a
/// failure; it is recorded so a `--update-baselines` run can seed it.
fn verdict(
    ctx: &storecheck_harness::ScenarioCtx,
    name: &str,
    max_ratio: Option<f64>,
    result: storecheck_harness::Result<crate::visual::VisualDiff>,
) -> storecheck_harness::Result<()> {
    match result {
        Ok(diff) if diff.matches => {
            ctx.parameter(
                &format!("{name} diff ratio"),
                &format!("{:.4}", diff.diff_ratio),
            );
            Ok(())
        }
        Ok(diff) => Err(Error::ScreenshotMismatch {
            name: name.to_string(),
            ratio: diff.diff_ratio,
            max_ratio: max_ratio.unwrap_or(ctx.config().visual.max_diff_ratio),
        }),
        Err(Error::BaselineMissing(missing)) => {
            ctx.parameter(
                "baseline",
                &format!("'{missing}' missing - run with --update-baselines to seed it"),
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("login-page-matches-baseline")
            .epic("User Interface")
            .feature("Visual Testing")
            .tag("visual")
            .fixtures(&["home_page", "visual"])
            .run(|ctx| async move {
                let tester = ctx.fixture::<VisualTester>("visual")?;

                ctx.step("capture login page", async {
                    let shot = ctx.driver().screenshot(None).await?;
                    ctx.attach("login page", "image/png", &shot);
                    // The login page is static chrome; hold it tight
                    verdict(
                        &ctx,
                        "login-page",
                        Some(0.01),
                        tester.compare("login-page", &shot, Some(0.01)),
                    )
                })
                .await
            }),
        Scenario::new("product-grid-matches-baseline")
            .epic("User Interface")
            .feature("Visual Testing")
            .tag("visual")
            .fixtures(&["logged_in_page", "visual"])
            .run(|ctx| async move {
                let tester = ctx.fixture::<VisualTester>("visual")?;

                ctx.step("verify consistent layout", async {
                    let driver = ctx.driver();
                    driver
                        .set_viewport(Viewport {
                            width: 1280,
                            height: 800,
                        })
                        .await?;

                    let shot = driver.screenshot(Some(sel::INVENTORY_LIST)).await?;
                    ctx.attach("product grid", "image/png", &shot);
                    verdict(
                        &ctx,
                        "product-grid",
                        None,
                        tester.compare("product-grid", &shot, None),
                    )
                })
                .await
            }),
    ]
}
