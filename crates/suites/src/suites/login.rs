//! Sign-in screens: the username/password form and the mobile-number form

use std::time::Duration;

use okiedokie_harness::driver::{Expectation, LoadState};
use okiedokie_harness::session::{open_sign_in, request_otp, submit_credentials, wait_for_marker};
use okiedokie_harness::{E2eResult, ScenarioContext, Suite};

use crate::login::{mobile_password_flow, password_flow, SLOW_SCREEN_TIMEOUT};
use crate::selectors;

const UNKNOWN_USER: &str = "wrongUser";
const WRONG_SECRET: &str = "wrongPass";
const INVALID_MOBILE: &str = "12345";

/// Username/password form at `/login`
pub fn password_suite() -> E2eResult<Suite> {
    let mut suite = Suite::new("login", selectors::login()?);
    suite.before_each(|ctx| Box::pin(open_password_form(ctx)));

    suite
        .scenario("valid credentials reach the dashboard", |ctx| Box::pin(valid_login(ctx)))
        .tag("smoke");
    suite.scenario("unknown username shows an error", |ctx| {
        Box::pin(rejected_login(ctx, Rejection::UnknownUser))
    });
    suite.scenario("wrong password shows an error", |ctx| {
        Box::pin(rejected_login(ctx, Rejection::WrongSecret))
    });
    suite.scenario("empty fields show an error", |ctx| Box::pin(empty_login(ctx)));

    Ok(suite)
}

async fn open_password_form(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let flow = password_flow(ctx.selectors())?;
    open_sign_in(ctx.page()?, &flow).await
}

async fn valid_login(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let flow = password_flow(ctx.selectors())?;
    let creds = ctx.config().credentials()?;
    let page = ctx.page()?;

    submit_credentials(page, &flow, creds.identifier(), creds.secret()).await?;
    wait_for_marker(page, &flow).await
}

#[derive(Debug, Clone, Copy)]
enum Rejection {
    UnknownUser,
    WrongSecret,
}

async fn rejected_login(ctx: &mut ScenarioContext, rejection: Rejection) -> E2eResult<()> {
    let flow = password_flow(ctx.selectors())?;
    let creds = ctx.config().credentials()?;
    let (identifier, secret) = match rejection {
        Rejection::UnknownUser => (UNKNOWN_USER, creds.secret()),
        Rejection::WrongSecret => (creds.identifier(), WRONG_SECRET),
    };
    let page = ctx.page()?;

    submit_credentials(page, &flow, identifier, secret).await?;
    page.expect_contains_text(&ctx.sel("error")?, "Invalid credentials")
        .await
}

async fn empty_login(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let submit = ctx.sel("submit")?;

    page.wait_visible(&submit, None).await?;
    page.click(&submit).await?;
    page.expect_contains_text(&ctx.sel("error")?, "Username and password required")
        .await
}

/// Mobile-number form at `/auth/login`
pub fn mobile_suite() -> E2eResult<Suite> {
    let mut suite = Suite::new("mobile-login", selectors::mobile_login()?);
    suite
        .with_timeout(Duration::from_secs(180))
        .before_each(|ctx| Box::pin(open_mobile_form(ctx)));

    suite.scenario("TC-001: page loads with title and welcome text", |ctx| {
        Box::pin(title_and_welcome(ctx))
    });
    suite.scenario("TC-002: mobile input is visible and editable", |ctx| {
        Box::pin(mobile_input_editable(ctx))
    });
    suite.scenario("TC-003: OTP button starts the OTP flow", |ctx| Box::pin(otp_flow(ctx)));
    suite
        .scenario("TC-004: password login reaches the dashboard", |ctx| {
            Box::pin(mobile_password_login(ctx))
        })
        .tag("smoke");
    suite.scenario("TC-005: invalid mobile number shows an error", |ctx| {
        Box::pin(invalid_mobile(ctx))
    });

    Ok(suite)
}

async fn open_mobile_form(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let flow = mobile_password_flow(ctx.selectors())?;
    open_sign_in(ctx.page()?, &flow).await
}

async fn title_and_welcome(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.wait_for_load_state(LoadState::NetworkIdle).await?;
    page.expect_title("Okie Dokie", Some(SLOW_SCREEN_TIMEOUT)).await?;
    page.expect_within(&ctx.sel("welcome")?, Expectation::Visible, SLOW_SCREEN_TIMEOUT)
        .await
}

async fn mobile_input_editable(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let creds = ctx.config().credentials()?;
    let mobile = ctx.sel("mobile")?;
    let page = ctx.page()?;

    page.expect_within(&mobile, Expectation::Visible, SLOW_SCREEN_TIMEOUT)
        .await?;
    page.fill(&mobile, creds.identifier()).await?;
    page.expect_value(&mobile, creds.identifier()).await
}

async fn otp_flow(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let creds = ctx.config().credentials()?;
    let page = ctx.page()?;

    request_otp(
        page,
        &ctx.sel("mobile")?,
        &ctx.sel("get_otp")?,
        creds.identifier(),
        SLOW_SCREEN_TIMEOUT,
    )
    .await?;
    page.wait_visible(&ctx.sel("otp_pending")?, Some(SLOW_SCREEN_TIMEOUT))
        .await
}

async fn mobile_password_login(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let flow = mobile_password_flow(ctx.selectors())?;
    let creds = ctx.config().credentials()?;
    let page = ctx.page()?;

    submit_credentials(page, &flow, creds.identifier(), creds.secret()).await?;
    wait_for_marker(page, &flow).await
}

async fn invalid_mobile(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.fill(&ctx.sel("mobile")?, INVALID_MOBILE).await?;
    page.click(&ctx.sel("get_otp")?).await?;
    page.wait_visible(&ctx.sel("invalid_mobile")?, Some(SLOW_SCREEN_TIMEOUT))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use okiedokie_harness::report::{FailureKind, Outcome};
    use okiedokie_harness::session::Credentials;
    use okiedokie_harness::testing::ScriptedFactory;
    use okiedokie_harness::{E2eError, ScenarioFilter, SuiteConfig, TestRunner};

    fn config(dir: &std::path::Path) -> SuiteConfig {
        let mut config = SuiteConfig {
            output_dir: dir.to_path_buf(),
            retries: 0,
            ..SuiteConfig::default()
        };
        config.artifacts.screenshot = okiedokie_harness::config::CaptureMode::Never;
        config.artifacts.video = okiedokie_harness::config::CaptureMode::Never;
        config.artifacts.trace = okiedokie_harness::config::CaptureMode::Never;
        config.credentials = Some(Credentials::new("1010101111", "from-env"));
        config
    }

    fn grep(pattern: &str) -> ScenarioFilter {
        ScenarioFilter {
            tags: vec![],
            grep: Some(pattern.to_string()),
        }
    }

    #[tokio::test]
    async fn test_valid_login_uses_configured_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        let runner = TestRunner::with_config(config(dir.path()), factory.clone())
            .unwrap()
            .with_filter(grep("valid credentials"));

        let report = runner.run(&[password_suite().unwrap()]).await.unwrap();
        assert_eq!(report.passed, 1);

        let (_, driver) = &factory.sessions()[0];
        let fills: Vec<_> = driver
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                okiedokie_harness::driver::Command::Fill { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec!["1010101111", "from-env"]);
        assert_eq!(driver.labels()[0], "goto:/login");
    }

    #[tokio::test]
    async fn test_wrong_password_submits_literal_and_checks_error() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        let runner = TestRunner::with_config(config(dir.path()), factory.clone())
            .unwrap()
            .with_filter(grep("wrong password"));

        runner.run(&[password_suite().unwrap()]).await.unwrap();
        let (_, driver) = &factory.sessions()[0];
        assert!(driver
            .labels()
            .contains(&"expect:contains_text:.error-message".to_string()));
        assert!(driver.commands().iter().any(|c| matches!(
            c,
            okiedokie_harness::driver::Command::Fill { value, .. } if value == WRONG_SECRET
        )));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.credentials = None;
        let runner = TestRunner::with_config(cfg, Arc::new(ScriptedFactory::new()))
            .unwrap()
            .with_filter(grep("valid credentials"));

        let report = runner.run(&[password_suite().unwrap()]).await.unwrap();
        let result = &report.results[0];
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.failure().unwrap().kind, FailureKind::Config);
    }

    #[tokio::test]
    async fn test_mobile_password_login_reveals_then_presses_enter() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        let runner = TestRunner::with_config(config(dir.path()), factory.clone())
            .unwrap()
            .with_filter(grep("TC-004"));

        let report = runner.run(&[mobile_suite().unwrap()]).await.unwrap();
        assert_eq!(report.passed, 1);

        let labels = factory.sessions()[0].1.labels();
        assert!(labels.contains(&"click:text=Password Login".to_string()));
        assert!(labels.contains(&"press:Enter".to_string()));
    }

    #[tokio::test]
    async fn test_otp_button_never_enabled_fails() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::with(|_, _, driver| {
            driver.fail_on("expect:enabled:", || E2eError::AssertionFailed("disabled".to_string()));
        }));
        let runner = TestRunner::with_config(config(dir.path()), factory)
            .unwrap()
            .with_filter(grep("TC-003"));

        let report = runner.run(&[mobile_suite().unwrap()]).await.unwrap();
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_suites_are_well_formed() {
        password_suite().unwrap().validate().unwrap();
        let mobile = mobile_suite().unwrap();
        mobile.validate().unwrap();
        assert_eq!(mobile.len(), 5);
    }
}
