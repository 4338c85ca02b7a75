//! Login performance measurement

use std::time::Duration;

use storecheck_harness::{Error, Scenario};

use crate::fixtures::{LoginAs, Metrics};
use crate::pages::{sel, urls};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("performance-user-login-time")
            .epic("Performance")
            .feature("Load Times")
            .fixtures(&["login_as", "metrics"])
            .run(|ctx| async move {
                let login = ctx.fixture::<LoginAs>("login_as")?;
                let metrics = ctx.fixture::<Metrics>("metrics")?;

                let (_, duration) = metrics
                    .measure("performance user login", async {
                        login.login("performance").await?;
                        ctx.driver().wait_for_url(urls::INVENTORY).await
                    })
                    .await?;

                ctx.attach_screenshot("after performance user login").await;
                metrics.navigation_timing().await?;

                if duration > Duration::from_secs(10) {
                    return Err(Error::Assertion(format!(
                        "login took {} ms, expected under 10s",
                        duration.as_millis()
                    )));
                }
                Ok(())
            }),
        Scenario::new("compare-standard-and-performance-logins")
            .epic("Performance")
            .feature("Load Times")
            .fixtures(&["login_as", "metrics"])
            .run(|ctx| async move {
                let login = ctx.fixture::<LoginAs>("login_as")?;
                let metrics = ctx.fixture::<Metrics>("metrics")?;

                metrics
                    .measure("standard user login", async {
                        login.login("standard").await?;
                        ctx.driver().wait_for_url(urls::INVENTORY).await
                    })
                    .await?;

                // Log out so the second measurement starts from the login form
                ctx.driver().click(sel::BURGER_MENU).await?;
                ctx.driver().click(sel::LOGOUT_LINK).await?;

                metrics
                    .measure("performance user login", async {
                        login.login("performance").await?;
                        ctx.driver().wait_for_url(urls::INVENTORY).await
                    })
                    .await?;

                Ok(())
            }),
    ]
}
