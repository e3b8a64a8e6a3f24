//! Suite configuration
//!
//! Everything that used to live as process-wide Playwright config (base URL,
//! timeouts, retries, artifact capture) is an explicit [`SuiteConfig`] passed
//! to the runner. Values are layered: defaults, then `e2e.yaml`, then
//! environment, then command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::session::Credentials;

/// Environment variable overriding the target base URL
pub const ENV_BASE_URL: &str = "E2E_BASE_URL";
/// Environment variable carrying the login identifier
pub const ENV_LOGIN_ID: &str = "E2E_LOGIN_ID";
/// Environment variable carrying the login secret
pub const ENV_LOGIN_SECRET: &str = "E2E_LOGIN_SECRET";
/// Environment variable forcing headed mode (`1`/`true`)
pub const ENV_HEADED: &str = "E2E_HEADED";

/// Complete configuration for one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Base URL of the application under test
    pub base_url: String,

    /// Browser engine
    pub browser: Browser,

    /// Run without a visible browser window
    pub headless: bool,

    /// Default viewport for every new session
    pub viewport: Viewport,

    /// Accept self-signed certificates on the target
    pub ignore_https_errors: bool,

    /// Wait bounds
    pub timeouts: Timeouts,

    /// Extra attempts for a failed scenario
    pub retries: u32,

    /// Scenarios executed concurrently, each with its own browser
    pub workers: usize,

    /// What to capture per scenario
    pub artifacts: ArtifactPolicy,

    /// How the upload helper treats a single failing file
    pub upload_failure_policy: UploadFailurePolicy,

    /// Directory for results and artifacts
    pub output_dir: PathBuf,

    /// Directory whose `node_modules` provides `playwright` and `@playwright/test`
    pub node_project_dir: PathBuf,

    /// Sign-in credentials; normally injected through the environment
    #[serde(skip_serializing)]
    pub credentials: Option<Credentials>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://od-erp-qa.web.app".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            ignore_https_errors: true,
            timeouts: Timeouts::default(),
            retries: 1,
            workers: 1,
            artifacts: ArtifactPolicy::default(),
            upload_failure_policy: UploadFailurePolicy::LogAndContinue,
            output_dir: PathBuf::from("test-results"),
            node_project_dir: PathBuf::from("."),
            credentials: None,
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a YAML file, falling back to defaults if it is absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            debug!("Loading suite config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }

        if let Some(headed) = lookup(ENV_HEADED) {
            if matches!(headed.as_str(), "1" | "true" | "yes") {
                self.headless = false;
            }
        }

        let identifier = lookup(ENV_LOGIN_ID);
        let secret = lookup(ENV_LOGIN_SECRET);
        if let (Some(identifier), Some(secret)) = (identifier, secret) {
            self.credentials = Some(Credentials::new(identifier, secret));
        }
    }

    /// Check the values that would otherwise fail deep inside a scenario
    pub fn validate(&self) -> E2eResult<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(E2eError::Config(format!(
                "base_url must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".to_string()));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(E2eError::Config(format!(
                "viewport {}x{} is empty",
                self.viewport.width, self.viewport.height
            )));
        }

        if self.timeouts.scenario_ms < self.timeouts.action_ms {
            return Err(E2eError::Config(format!(
                "scenario timeout ({} ms) is shorter than the action timeout ({} ms)",
                self.timeouts.scenario_ms, self.timeouts.action_ms
            )));
        }

        Ok(())
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Credentials or a configuration error naming the variables to set
    pub fn credentials(&self) -> E2eResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            E2eError::Config(format!(
                "no login credentials; set {} and {}",
                ENV_LOGIN_ID, ENV_LOGIN_SECRET
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1366, 768)
    }
}

/// Wait bounds, in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default bound for a single action or element wait
    pub action_ms: u64,
    /// Default bound for page loads
    pub navigation_ms: u64,
    /// Ceiling for one scenario attempt, setup included
    pub scenario_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 15_000,
            navigation_ms: 30_000,
            scenario_ms: 60_000,
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn scenario(&self) -> Duration {
        Duration::from_millis(self.scenario_ms)
    }
}

/// When an artifact is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    Always,
    #[default]
    OnFailure,
    Never,
}

impl CaptureMode {
    /// Whether the browser has to record at all
    pub fn records(&self) -> bool {
        !matches!(self, CaptureMode::Never)
    }

    /// Whether the artifact of a finished attempt should be kept
    pub fn keep(&self, failed: bool) -> bool {
        match self {
            CaptureMode::Always => true,
            CaptureMode::OnFailure => failed,
            CaptureMode::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPolicy {
    pub screenshot: CaptureMode,
    pub video: CaptureMode,
    pub trace: CaptureMode,
}

/// Behavior of the upload helper when one file of a batch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFailurePolicy {
    /// Log the failing file and keep uploading the rest
    #[default]
    LogAndContinue,
    /// Stop at the first failing file and propagate its error
    Strict,
}
