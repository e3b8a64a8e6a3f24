//! Sign-in flows
//!
//! A [`LoginFlow`] describes one way the application lets a user in: where
//! the form lives, which inputs to fill, how to submit and what proves the
//! sign-in worked. Flows are data, so applications with several sign-in
//! screens model each as its own named flow instead of one helper with
//! branches.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::driver::{LoadState, PageDriver};
use crate::error::{E2eError, E2eResult};

/// Bound for the sign-in inputs to become interactable
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound for the post-login marker to appear
pub const DEFAULT_MARKER_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifier and secret for one account
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Same account, different secret
    pub fn with_secret(&self, secret: impl Into<String>) -> Self {
        Self::new(self.identifier.clone(), secret)
    }

    /// Same secret, different account
    pub fn with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self::new(identifier, self.secret.clone())
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(E2eError::Config("login identifier is empty".to_string()));
        }
        if self.secret.is_empty() {
            return Err(E2eError::Config("login secret is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// How the form is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    Click(String),
    /// Press Enter in the secret input
    PressEnter,
}

/// Observable proof that sign-in succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostLoginMarker {
    /// An element that only exists for signed-in users
    Selector(String),
    /// A URL glob the app redirects to
    Url(String),
}

#[derive(Debug, Clone)]
pub struct LoginFlow {
    /// Name used in logs
    pub name: String,
    /// Sign-in entry point, relative to the base URL
    pub entry_path: String,
    /// Load state awaited after navigating to the entry point
    pub entry_wait: LoadState,
    pub identifier_input: String,
    pub secret_input: String,
    /// Control that has to be clicked before the secret input shows up
    pub reveal_secret: Option<String>,
    pub submit: Submit,
    pub marker: PostLoginMarker,
    pub input_timeout: Duration,
    pub marker_timeout: Duration,
}

impl LoginFlow {
    pub fn new(
        name: impl Into<String>,
        entry_path: impl Into<String>,
        identifier_input: impl Into<String>,
        secret_input: impl Into<String>,
        submit: Submit,
        marker: PostLoginMarker,
    ) -> Self {
        Self {
            name: name.into(),
            entry_path: entry_path.into(),
            entry_wait: LoadState::Load,
            identifier_input: identifier_input.into(),
            secret_input: secret_input.into(),
            reveal_secret: None,
            submit,
            marker,
            input_timeout: DEFAULT_INPUT_TIMEOUT,
            marker_timeout: DEFAULT_MARKER_TIMEOUT,
        }
    }

    pub fn with_entry_wait(mut self, state: LoadState) -> Self {
        self.entry_wait = state;
        self
    }

    pub fn with_reveal(mut self, selector: impl Into<String>) -> Self {
        self.reveal_secret = Some(selector.into());
        self
    }

    pub fn with_timeouts(mut self, input: Duration, marker: Duration) -> Self {
        self.input_timeout = input;
        self.marker_timeout = marker;
        self
    }
}

/// Open the sign-in page and wait until the identifier input is usable
pub async fn open_sign_in(page: &dyn PageDriver, flow: &LoginFlow) -> E2eResult<()> {
    page.goto_until(&flow.entry_path, flow.entry_wait).await?;
    page.wait_visible(&flow.identifier_input, Some(flow.input_timeout))
        .await
}

/// Fill and submit the form without waiting for the outcome
///
/// Values are not validated, so negative scenarios can submit empty or wrong
/// credentials. The page must already show the sign-in form.
pub async fn submit_credentials(
    page: &dyn PageDriver,
    flow: &LoginFlow,
    identifier: &str,
    secret: &str,
) -> E2eResult<()> {
    if let Some(reveal) = &flow.reveal_secret {
        page.click(reveal).await?;
    }
    page.wait_visible(&flow.secret_input, Some(flow.input_timeout))
        .await?;

    page.fill(&flow.identifier_input, identifier).await?;
    page.fill(&flow.secret_input, secret).await?;

    match &flow.submit {
        Submit::Click(selector) => page.click(selector).await,
        Submit::PressEnter => page.press(Some(&flow.secret_input), "Enter").await,
    }
}

/// Wait for the flow's post-login marker
pub async fn wait_for_marker(page: &dyn PageDriver, flow: &LoginFlow) -> E2eResult<()> {
    match &flow.marker {
        PostLoginMarker::Selector(selector) => {
            page.wait_visible(selector, Some(flow.marker_timeout)).await
        }
        PostLoginMarker::Url(pattern) => {
            page.wait_for_url(pattern, Some(flow.marker_timeout)).await
        }
    }
}

/// Sign in and return once the post-login marker is visible
///
/// Any timeout is returned to the caller unchanged; there is no retry here.
pub async fn login(page: &dyn PageDriver, flow: &LoginFlow, credentials: &Credentials) -> E2eResult<()> {
    credentials.validate()?;
    info!("Signing in via {} flow as {}", flow.name, credentials.identifier());

    open_sign_in(page, flow).await?;
    submit_credentials(page, flow, credentials.identifier(), credentials.secret()).await?;
    wait_for_marker(page, flow).await?;

    info!("Signed in via {} flow", flow.name);
    Ok(())
}

/// Ask for a one-time password for `mobile`
pub async fn request_otp(
    page: &dyn PageDriver,
    mobile_input: &str,
    otp_button: &str,
    mobile: &str,
    timeout: Duration,
) -> E2eResult<()> {
    page.fill(mobile_input, mobile).await?;
    page.wait_visible(otp_button, Some(timeout)).await?;
    page.expect_enabled(otp_button).await?;
    page.click(otp_button).await
}
