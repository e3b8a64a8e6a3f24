//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install playwright @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright driver error: {0}")]
    Driver(String),

    #[error("Driver session closed: {0}")]
    SessionClosed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown selector '{0}'")]
    UnknownSelector(String),

    #[error("Fixture error in {source_name}: {reason}")]
    Fixture { source_name: String, reason: String },

    #[error("Suite definition error: {0}")]
    SuiteDefinition(String),

    #[error("Upload failed for {file}: {reason}")]
    Upload { file: String, reason: String },

    #[error("Target not reachable after {0} attempts")]
    TargetUnreachable(usize),

    #[error("Skipped: {0}")]
    Skipped(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Shorthand for a fixture error tied to a catalog source
    pub fn fixture(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::Fixture {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from an element/network wait that did not settle
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
