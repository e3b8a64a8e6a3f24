//! Browser driver seam
//!
//! Every helper talks to the browser through [`PageDriver`]. A driver only
//! has to execute one [`Command`] at a time; the typed operations below are
//! provided on top of that, so a fake driver for tests is a single method.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Viewport;
use crate::error::{E2eError, E2eResult};
use crate::selectors::is_unresolved;

/// One browser operation, serialized as a JSON line to the driver program
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Navigate to a URL (relative to the base URL)
    Goto {
        url: String,
        wait_until: LoadState,
        timeout_ms: Option<u64>,
    },

    /// Wait until the page URL matches a glob
    WaitForUrl {
        pattern: String,
        timeout_ms: Option<u64>,
    },

    WaitForLoadState {
        state: LoadState,
        timeout_ms: Option<u64>,
    },

    /// Wait for any element matching the selector to reach a state
    WaitFor {
        selector: String,
        state: WaitState,
        timeout_ms: Option<u64>,
    },

    Click {
        selector: String,
        timeout_ms: Option<u64>,
    },

    /// Replace the value of an input
    Fill {
        selector: String,
        value: String,
        timeout_ms: Option<u64>,
    },

    /// Type text key by key, like a user would
    TypeText {
        selector: String,
        text: String,
        timeout_ms: Option<u64>,
    },

    /// Press a key on an element, or on the page when no selector is given
    Press {
        selector: Option<String>,
        key: String,
    },

    Check {
        selector: String,
        checked: bool,
    },

    SelectOption {
        selector: String,
        option: SelectBy,
    },

    SetInputFiles {
        selector: String,
        files: Vec<PathBuf>,
        timeout_ms: Option<u64>,
    },

    SetViewport {
        width: u32,
        height: u32,
    },

    SetOffline {
        offline: bool,
    },

    GoBack,

    GoForward,

    Reload,

    /// Evaluate a JavaScript expression in the page
    Evaluate {
        expression: String,
    },

    /// Wait until a JavaScript expression is truthy
    WaitForFunction {
        expression: String,
        timeout_ms: Option<u64>,
    },

    /// Web-first assertion on a locator
    Expect {
        selector: String,
        expectation: Expectation,
        negate: bool,
        timeout_ms: Option<u64>,
    },

    ExpectTitle {
        pattern: String,
        timeout_ms: Option<u64>,
    },

    Count {
        selector: String,
    },

    TextContents {
        selector: String,
    },

    InputValue {
        selector: String,
        timeout_ms: Option<u64>,
    },

    Url,

    Screenshot {
        path: PathBuf,
        full_page: bool,
    },

    /// Close the context; the trace is written when a path is given
    Close {
        trace_path: Option<PathBuf>,
    },
}

impl Command {
    /// Selector targeted by the command, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Command::WaitFor { selector, .. }
            | Command::Click { selector, .. }
            | Command::Fill { selector, .. }
            | Command::TypeText { selector, .. }
            | Command::Check { selector, .. }
            | Command::SelectOption { selector, .. }
            | Command::SetInputFiles { selector, .. }
            | Command::Expect { selector, .. }
            | Command::Count { selector }
            | Command::TextContents { selector }
            | Command::InputValue { selector, .. } => Some(selector),
            Command::Press { selector, .. } => selector.as_deref(),
            _ => None,
        }
    }

    /// Refuse commands carrying an unresolved selector
    pub fn validate(&self) -> E2eResult<()> {
        match self.selector() {
            Some(selector) if is_unresolved(selector) => Err(E2eError::Config(format!(
                "{} has an unresolved selector",
                self.label()
            ))),
            _ => Ok(()),
        }
    }

    /// Short name for logs and reports
    pub fn label(&self) -> String {
        match self {
            Command::Goto { url, .. } => format!("goto:{}", url),
            Command::WaitForUrl { pattern, .. } => format!("wait_for_url:{}", pattern),
            Command::WaitForLoadState { state, .. } => format!("wait_for_load_state:{:?}", state),
            Command::WaitFor { selector, .. } => format!("wait:{}", selector),
            Command::Click { selector, .. } => format!("click:{}", selector),
            Command::Fill { selector, .. } => format!("fill:{}", selector),
            Command::TypeText { selector, .. } => format!("type:{}", selector),
            Command::Press { key, .. } => format!("press:{}", key),
            Command::Check { selector, checked } => {
                format!("{}:{}", if *checked { "check" } else { "uncheck" }, selector)
            }
            Command::SelectOption { selector, .. } => format!("select:{}", selector),
            Command::SetInputFiles { selector, .. } => format!("set_input_files:{}", selector),
            Command::SetViewport { width, height } => format!("viewport:{}x{}", width, height),
            Command::SetOffline { offline } => format!("offline:{}", offline),
            Command::GoBack => "go_back".to_string(),
            Command::GoForward => "go_forward".to_string(),
            Command::Reload => "reload".to_string(),
            Command::Evaluate { .. } => "evaluate".to_string(),
            Command::WaitForFunction { .. } => "wait_for_function".to_string(),
            Command::Expect { selector, expectation, negate, .. } => format!(
                "expect{}:{}:{}",
                if *negate { "_not" } else { "" },
                expectation.name(),
                selector
            ),
            Command::ExpectTitle { pattern, .. } => format!("expect_title:{}", pattern),
            Command::Count { selector } => format!("count:{}", selector),
            Command::TextContents { selector } => format!("text_contents:{}", selector),
            Command::InputValue { selector, .. } => format!("input_value:{}", selector),
            Command::Url => "url".to_string(),
            Command::Screenshot { path, .. } => format!("screenshot:{}", path.display()),
            Command::Close { .. } => "close".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// How to pick an `<option>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum SelectBy {
    Index(usize),
    Value(String),
    Label(String),
}

/// Assertion evaluated by the browser with auto-waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    Visible,
    Hidden,
    Text { text: String },
    ContainsText { text: String },
    Value { value: String },
    Attribute { name: String, value: String },
    ClassMatches { pattern: String },
    Checked,
    Enabled,
    Editable,
    Count { count: usize },
}

impl Expectation {
    pub fn name(&self) -> &'static str {
        match self {
            Expectation::Visible => "visible",
            Expectation::Hidden => "hidden",
            Expectation::Text { .. } => "text",
            Expectation::ContainsText { .. } => "contains_text",
            Expectation::Value { .. } => "value",
            Expectation::Attribute { .. } => "attribute",
            Expectation::ClassMatches { .. } => "class_matches",
            Expectation::Checked => "checked",
            Expectation::Enabled => "enabled",
            Expectation::Editable => "editable",
            Expectation::Count { .. } => "count",
        }
    }
}

/// What the driver reports after closing a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    #[serde(default)]
    pub video: Option<PathBuf>,
}

fn millis(timeout: Option<Duration>) -> Option<u64> {
    timeout.map(|t| t.as_millis() as u64)
}

/// A live page in an isolated browser context
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Execute one command and return its raw result
    async fn execute(&self, command: Command) -> E2eResult<Value>;

    /// Release the underlying browser process
    async fn shutdown(&self) -> E2eResult<()> {
        Ok(())
    }

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.goto_until(url, LoadState::Load).await
    }

    async fn goto_until(&self, url: &str, wait_until: LoadState) -> E2eResult<()> {
        self.execute(Command::Goto {
            url: url.to_string(),
            wait_until,
            timeout_ms: None,
        })
        .await
        .map(drop)
    }

    async fn wait_for_url(&self, pattern: &str, timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::WaitForUrl {
            pattern: pattern.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        self.execute(Command::WaitForLoadState { state, timeout_ms: None })
            .await
            .map(drop)
    }

    async fn wait_for(&self, selector: &str, state: WaitState, timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::WaitFor {
            selector: selector.to_string(),
            state,
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn wait_visible(&self, selector: &str, timeout: Option<Duration>) -> E2eResult<()> {
        self.wait_for(selector, WaitState::Visible, timeout).await
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.execute(Command::Click {
            selector: selector.to_string(),
            timeout_ms: None,
        })
        .await
        .map(drop)
    }

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.execute(Command::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
            timeout_ms: None,
        })
        .await
        .map(drop)
    }

    /// Fill with its own bound instead of the action timeout
    async fn fill_within(&self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        self.execute(Command::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
            timeout_ms: millis(Some(timeout)),
        })
        .await
        .map(drop)
    }

    async fn type_text(&self, selector: &str, text: &str, timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::TypeText {
            selector: selector.to_string(),
            text: text.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn press(&self, selector: Option<&str>, key: &str) -> E2eResult<()> {
        self.execute(Command::Press {
            selector: selector.map(String::from),
            key: key.to_string(),
        })
        .await
        .map(drop)
    }

    async fn check(&self, selector: &str) -> E2eResult<()> {
        self.execute(Command::Check {
            selector: selector.to_string(),
            checked: true,
        })
        .await
        .map(drop)
    }

    async fn uncheck(&self, selector: &str) -> E2eResult<()> {
        self.execute(Command::Check {
            selector: selector.to_string(),
            checked: false,
        })
        .await
        .map(drop)
    }

    async fn select_option(&self, selector: &str, option: SelectBy) -> E2eResult<()> {
        self.execute(Command::SelectOption {
            selector: selector.to_string(),
            option,
        })
        .await
        .map(drop)
    }

    async fn set_input_files(&self, selector: &str, files: &[PathBuf], timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::SetInputFiles {
            selector: selector.to_string(),
            files: files.to_vec(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.execute(Command::SetViewport {
            width: viewport.width,
            height: viewport.height,
        })
        .await
        .map(drop)
    }

    async fn set_offline(&self, offline: bool) -> E2eResult<()> {
        self.execute(Command::SetOffline { offline }).await.map(drop)
    }

    async fn go_back(&self) -> E2eResult<()> {
        self.execute(Command::GoBack).await.map(drop)
    }

    async fn go_forward(&self) -> E2eResult<()> {
        self.execute(Command::GoForward).await.map(drop)
    }

    async fn reload(&self) -> E2eResult<()> {
        self.execute(Command::Reload).await.map(drop)
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        self.execute(Command::Evaluate {
            expression: expression.to_string(),
        })
        .await
    }

    async fn wait_for_function(&self, expression: &str, timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::WaitForFunction {
            expression: expression.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn expect(&self, selector: &str, expectation: Expectation) -> E2eResult<()> {
        self.execute(Command::Expect {
            selector: selector.to_string(),
            expectation,
            negate: false,
            timeout_ms: None,
        })
        .await
        .map(drop)
    }

    async fn expect_within(&self, selector: &str, expectation: Expectation, timeout: Duration) -> E2eResult<()> {
        self.execute(Command::Expect {
            selector: selector.to_string(),
            expectation,
            negate: false,
            timeout_ms: Some(timeout.as_millis() as u64),
        })
        .await
        .map(drop)
    }

    async fn expect_not(&self, selector: &str, expectation: Expectation) -> E2eResult<()> {
        self.execute(Command::Expect {
            selector: selector.to_string(),
            expectation,
            negate: true,
            timeout_ms: None,
        })
        .await
        .map(drop)
    }

    async fn expect_visible(&self, selector: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::Visible).await
    }

    async fn expect_hidden(&self, selector: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::Hidden).await
    }

    async fn expect_contains_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::ContainsText { text: text.to_string() })
            .await
    }

    async fn expect_not_contains_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        self.expect_not(selector, Expectation::ContainsText { text: text.to_string() })
            .await
    }

    async fn expect_value(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::Value { value: value.to_string() })
            .await
    }

    async fn expect_attribute(&self, selector: &str, name: &str, value: &str) -> E2eResult<()> {
        self.expect(
            selector,
            Expectation::Attribute {
                name: name.to_string(),
                value: value.to_string(),
            },
        )
        .await
    }

    async fn expect_class(&self, selector: &str, pattern: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::ClassMatches { pattern: pattern.to_string() })
            .await
    }

    async fn expect_checked(&self, selector: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::Checked).await
    }

    async fn expect_enabled(&self, selector: &str) -> E2eResult<()> {
        self.expect(selector, Expectation::Enabled).await
    }

    async fn expect_count(&self, selector: &str, count: usize) -> E2eResult<()> {
        self.expect(selector, Expectation::Count { count }).await
    }

    async fn expect_title(&self, pattern: &str, timeout: Option<Duration>) -> E2eResult<()> {
        self.execute(Command::ExpectTitle {
            pattern: pattern.to_string(),
            timeout_ms: millis(timeout),
        })
        .await
        .map(drop)
    }

    async fn count(&self, selector: &str) -> E2eResult<usize> {
        let value = self
            .execute(Command::Count {
                selector: selector.to_string(),
            })
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Driver(format!("count of '{}' returned {}", selector, value)))
    }

    /// Count matches now and require at least `min`
    async fn expect_count_at_least(&self, selector: &str, min: usize) -> E2eResult<usize> {
        let count = self.count(selector).await?;
        if count < min {
            return Err(E2eError::AssertionFailed(format!(
                "expected at least {} element(s) for '{}', found {}",
                min, selector, count
            )));
        }
        Ok(count)
    }

    /// Count matches now and require at most `max`
    async fn expect_count_at_most(&self, selector: &str, max: usize) -> E2eResult<usize> {
        let count = self.count(selector).await?;
        if count > max {
            return Err(E2eError::AssertionFailed(format!(
                "expected at most {} element(s) for '{}', found {}",
                max, selector, count
            )));
        }
        Ok(count)
    }

    async fn text_contents(&self, selector: &str) -> E2eResult<Vec<String>> {
        let value = self
            .execute(Command::TextContents {
                selector: selector.to_string(),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn input_value(&self, selector: &str) -> E2eResult<String> {
        let value = self
            .execute(Command::InputValue {
                selector: selector.to_string(),
                timeout_ms: None,
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn url(&self) -> E2eResult<String> {
        let value = self.execute(Command::Url).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<PathBuf> {
        self.execute(Command::Screenshot {
            path: path.to_path_buf(),
            full_page,
        })
        .await?;
        Ok(path.to_path_buf())
    }

    async fn close(&self, trace_path: Option<&Path>) -> E2eResult<CloseOutcome> {
        let value = self
            .execute(Command::Close {
                trace_path: trace_path.map(Path::to_path_buf),
            })
            .await?;
        if value.is_null() {
            return Ok(CloseOutcome::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl<T: PageDriver + ?Sized> PageDriver for Arc<T> {
    async fn execute(&self, command: Command) -> E2eResult<Value> {
        (**self).execute(command).await
    }

    async fn shutdown(&self) -> E2eResult<()> {
        (**self).shutdown().await
    }
}

/// Where a new session keeps its recordings
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Scenario name plus attempt, for logs
    pub label: String,
    /// Directory for this attempt's artifacts
    pub artifact_dir: PathBuf,
}

/// Opens a fresh, isolated page per scenario attempt
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, request: &SessionRequest) -> E2eResult<Box<dyn PageDriver>>;
}
