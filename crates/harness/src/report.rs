//! Scenario results, the JSON artifact and list output

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{E2eError, E2eResult};

/// File name of the structured report inside the output directory
pub const RESULTS_FILE: &str = "test-results.json";

/// Final state of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// Failed at least once, then passed on retry
    Flaky,
    Failed,
    Skipped,
}

impl Outcome {
    fn symbol(&self) -> &'static str {
        match self {
            Outcome::Passed => "✓",
            Outcome::Flaky => "~",
            Outcome::Failed => "✗",
            Outcome::Skipped => "-",
        }
    }
}

/// Failure taxonomy used for retry decisions and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Session launch or the before-each hook failed
    Setup,
    /// An expectation about observable state did not hold
    Assertion,
    /// A wait did not settle in time, or the driver/network dropped out
    Transient,
    /// Unknown selector, bad fixture, missing credentials
    Config,
    /// Some files of an upload were not confirmed
    PartialResource,
}

impl FailureKind {
    /// Classify an error raised by a scenario body
    pub fn of(error: &E2eError) -> Self {
        match error {
            E2eError::AssertionFailed(_) => FailureKind::Assertion,
            E2eError::Upload { .. } => FailureKind::PartialResource,
            E2eError::Config(_)
            | E2eError::UnknownSelector(_)
            | E2eError::Fixture { .. }
            | E2eError::SuiteDefinition(_)
            | E2eError::PlaywrightNotFound
            | E2eError::Yaml(_) => FailureKind::Config,
            E2eError::Timeout(_)
            | E2eError::Driver(_)
            | E2eError::SessionClosed(_)
            | E2eError::TargetUnreachable(_)
            | E2eError::Http(_)
            | E2eError::Io(_)
            | E2eError::Json(_)
            | E2eError::Skipped(_) => FailureKind::Transient,
        }
    }

    /// Whether another attempt could plausibly change the result
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Setup | FailureKind::Transient)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Last driver step issued before the failure, e.g. `expect:visible:.error-message`
    pub expectation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Screenshot,
    Video,
    Trace,
}

/// A file captured for diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

impl Artifact {
    /// Record an artifact file together with its digest
    pub fn from_file(kind: ArtifactKind, path: &Path) -> E2eResult<Self> {
        let data = std::fs::read(path)?;
        Ok(Self {
            kind,
            path: path.to_path_buf(),
            sha256: hash_bytes(&data),
            bytes: data.len() as u64,
        })
    }
}

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// One attempt at a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt: u32,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub failure: Option<Failure>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub suite: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub skip_reason: Option<String>,
    pub attempts: Vec<AttemptResult>,
}

impl ScenarioResult {
    pub fn title(&self) -> String {
        format!("{} › {}", self.suite, self.name)
    }

    /// Failure of the last attempt, if it failed
    pub fn failure(&self) -> Option<&Failure> {
        self.attempts.last().and_then(|a| a.failure.as_ref())
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.attempts.iter().flat_map(|a| a.artifacts.iter())
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    pub fn new(base_url: impl Into<String>, started_at: DateTime<Utc>, results: Vec<ScenarioResult>) -> Self {
        let finished_at = Utc::now();
        let count = |o: Outcome| results.iter().filter(|r| r.outcome == o).count();
        Self {
            started_at,
            finished_at,
            base_url: base_url.into(),
            total: results.len(),
            passed: count(Outcome::Passed),
            flaky: count(Outcome::Flaky),
            failed: count(Outcome::Failed),
            skipped: count(Outcome::Skipped),
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            results,
        }
    }

    /// Flaky scenarios count as passing
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for the run
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| r.outcome == Outcome::Failed)
    }

    /// Write `test-results.json` into `dir`
    pub fn write_json(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    pub fn read_json(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Human readable list: one line per scenario, failure details, summary
    pub fn render_list(&self) -> String {
        let mut out = String::new();

        for result in &self.results {
            let _ = write!(out, "  {} {}", result.outcome.symbol(), result.title());
            match (&result.outcome, &result.skip_reason) {
                (Outcome::Skipped, Some(reason)) => {
                    let _ = writeln!(out, " ({})", reason);
                }
                (Outcome::Flaky, _) => {
                    let _ = writeln!(
                        out,
                        " ({} ms, passed on attempt {})",
                        result.duration_ms,
                        result.attempts.len()
                    );
                }
                _ => {
                    let _ = writeln!(out, " ({} ms)", result.duration_ms);
                }
            }
        }

        for (i, result) in self.failures().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "  {}) {}", i + 1, result.title());
            if let Some(failure) = result.failure() {
                let _ = writeln!(out, "     {:?}: {}", failure.kind, failure.message);
                if let Some(step) = &failure.expectation {
                    let _ = writeln!(out, "     at {}", step);
                }
            }
            for artifact in result.artifacts() {
                let _ = writeln!(out, "     {:?}: {}", artifact.kind, artifact.path.display());
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {} passed, {} flaky, {} failed, {} skipped ({:.1}s)",
            self.passed,
            self.flaky,
            self.failed,
            self.skipped,
            self.duration_ms as f64 / 1000.0
        );
        out
    }
}
