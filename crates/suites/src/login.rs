//! The application's sign-in flows

use std::time::Duration;

use okiedokie_harness::driver::LoadState;
use okiedokie_harness::session::{PostLoginMarker, Submit};
use okiedokie_harness::{E2eResult, LoginFlow, SelectorRegistry};

/// Bound used by the slower Angular sign-in screens
pub const SLOW_SCREEN_TIMEOUT: Duration = Duration::from_secs(60);

/// Username and password at `/login`, landing on the dashboard
pub fn password_flow(selectors: &SelectorRegistry) -> E2eResult<LoginFlow> {
    Ok(LoginFlow::new(
        "password",
        "/login",
        selectors.require("username", &[])?,
        selectors.require("password", &[])?,
        Submit::Click(selectors.require("submit", &[])?),
        PostLoginMarker::Selector(selectors.require("dashboard", &[])?),
    ))
}

/// Mobile number plus password at `/auth/login`
///
/// The password input only appears after choosing "Password Login", and the
/// form is submitted with Enter.
pub fn mobile_password_flow(selectors: &SelectorRegistry) -> E2eResult<LoginFlow> {
    Ok(LoginFlow::new(
        "mobile-password",
        "/auth/login",
        selectors.require("mobile", &[])?,
        selectors.require("password", &[])?,
        Submit::PressEnter,
        PostLoginMarker::Selector(selectors.require("dashboard", &[])?),
    )
    .with_entry_wait(LoadState::NetworkIdle)
    .with_reveal(selectors.require("password_login", &[])?)
    .with_timeouts(SLOW_SCREEN_TIMEOUT, SLOW_SCREEN_TIMEOUT))
}

/// Sign-in that redirects straight to the homework manager
pub fn homework_manager_flow(selectors: &SelectorRegistry) -> E2eResult<LoginFlow> {
    Ok(LoginFlow::new(
        "homework-manager",
        "/login",
        selectors.require("username", &[])?,
        selectors.require("password", &[])?,
        Submit::Click(selectors.require("login", &[])?),
        PostLoginMarker::Url("**/homework-manager".to_string()),
    )
    .with_entry_wait(LoadState::NetworkIdle)
    .with_timeouts(SLOW_SCREEN_TIMEOUT, SLOW_SCREEN_TIMEOUT))
}
