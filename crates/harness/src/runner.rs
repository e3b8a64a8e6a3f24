//! Test runner that orchestrates sessions, retries and diagnostics

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::driver::{Command, PageDriver, SessionFactory, SessionRequest};
use crate::error::{E2eError, E2eResult};
use crate::report::{Artifact, ArtifactKind, AttemptResult, Failure, FailureKind, Outcome, ScenarioResult, SuiteReport};
use crate::suite::{Scenario, ScenarioContext, ScenarioKind, Suite};

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    /// Run scenarios carrying any of these tags; empty means all
    pub tags: Vec<String>,
    /// Substring of `"suite › scenario"`
    pub grep: Option<String>,
}

impl ScenarioFilter {
    pub fn matches(&self, suite: &Suite, scenario: &Scenario) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| scenario.has_tag(t)) {
            return false;
        }
        match &self.grep {
            Some(pattern) => format!("{} › {}", suite.name, scenario.name).contains(pattern.as_str()),
            None => true,
        }
    }
}

/// A scenario selected for execution, as shown by `--list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScenario {
    pub suite: String,
    pub name: String,
    pub tags: Vec<String>,
    pub skip: Option<String>,
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<SuiteConfig>,
    factory: Arc<dyn SessionFactory>,
    api: ApiClient,
    filter: ScenarioFilter,
}

impl TestRunner {
    /// Create a runner opening pages through `factory`
    pub fn with_config(config: SuiteConfig, factory: Arc<dyn SessionFactory>) -> E2eResult<Self> {
        config.validate()?;
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            factory,
            api,
            filter: ScenarioFilter::default(),
        })
    }

    pub fn with_filter(mut self, filter: ScenarioFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Validate suites and list the scenarios the filter selects
    pub fn plan(&self, suites: &[Suite]) -> E2eResult<Vec<PlannedScenario>> {
        Ok(self
            .selected(suites)?
            .into_iter()
            .map(|(suite, scenario)| PlannedScenario {
                suite: suite.name.clone(),
                name: scenario.name.clone(),
                tags: scenario.tags.clone(),
                skip: scenario.skip.clone(),
            })
            .collect())
    }

    fn selected<'s>(&self, suites: &'s [Suite]) -> E2eResult<Vec<(&'s Suite, &'s Scenario)>> {
        let mut jobs = Vec::new();
        for suite in suites {
            suite.validate()?;
            for scenario in suite.scenarios() {
                if self.filter.matches(suite, scenario) {
                    jobs.push((suite, scenario));
                }
            }
        }
        Ok(jobs)
    }

    /// Run every selected scenario, `workers` at a time
    pub async fn run(&self, suites: &[Suite]) -> E2eResult<SuiteReport> {
        let jobs = self.selected(suites)?;
        let started_at = Utc::now();

        info!(
            "Running {} scenario(s) with {} worker(s) against {}",
            jobs.len(),
            self.config.workers,
            self.config.base_url
        );

        let mut results: Vec<(usize, ScenarioResult)> = stream::iter(jobs.into_iter().enumerate())
            .map(|(i, (suite, scenario))| async move { (i, self.run_scenario(suite, scenario).await) })
            .buffer_unordered(self.config.workers)
            .collect()
            .await;
        results.sort_by_key(|(i, _)| *i);

        let report = SuiteReport::new(
            self.config.base_url.clone(),
            started_at,
            results.into_iter().map(|(_, r)| r).collect(),
        );

        info!("");
        info!(
            "Test Results: {} passed, {} flaky, {} failed, {} skipped ({} ms)",
            report.passed, report.flaky, report.failed, report.skipped, report.duration_ms
        );
        Ok(report)
    }

    /// Run one scenario through its attempts
    pub async fn run_scenario(&self, suite: &Suite, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let title = format!("{} › {}", suite.name, scenario.name);

        let mut result = ScenarioResult {
            suite: suite.name.clone(),
            name: scenario.name.clone(),
            tags: scenario.tags.clone(),
            outcome: Outcome::Skipped,
            duration_ms: 0,
            skip_reason: scenario.skip.clone(),
            attempts: Vec::new(),
        };

        if let Some(reason) = &scenario.skip {
            info!("- {} (skipped: {})", title, reason);
            return result;
        }

        let max_attempts = 1 + scenario.retries.unwrap_or(self.config.retries);
        for attempt in 1..=max_attempts {
            let (attempt_result, skip_reason) = self.run_attempt(suite, scenario, attempt).await;
            let outcome = attempt_result.outcome;
            let retryable = attempt_result
                .failure
                .as_ref()
                .map(|f| f.kind.is_retryable())
                .unwrap_or(false);
            result.attempts.push(attempt_result);

            match outcome {
                Outcome::Passed => {
                    result.outcome = if attempt == 1 { Outcome::Passed } else { Outcome::Flaky };
                    break;
                }
                Outcome::Skipped => {
                    result.outcome = Outcome::Skipped;
                    result.skip_reason = skip_reason;
                    break;
                }
                _ => {
                    result.outcome = Outcome::Failed;
                    if !retryable {
                        break;
                    }
                    if attempt < max_attempts {
                        warn!("{} failed on attempt {}, retrying", title, attempt);
                    }
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;

        match result.outcome {
            Outcome::Passed => info!("✓ {} ({} ms)", title, result.duration_ms),
            Outcome::Flaky => warn!("~ {} passed on attempt {} ({} ms)", title, result.attempts.len(), result.duration_ms),
            Outcome::Skipped => info!("- {} (skipped)", title),
            Outcome::Failed => error!(
                "✗ {} - {}",
                title,
                result.failure().map(|f| f.message.as_str()).unwrap_or("unknown error")
            ),
        }
        result
    }

    async fn run_attempt(&self, suite: &Suite, scenario: &Scenario, attempt: u32) -> (AttemptResult, Option<String>) {
        let start = Instant::now();
        let label = session_label(suite, scenario, attempt);
        let artifact_dir = self.config.output_dir.join(&label);
        let last_step = Arc::new(Mutex::new(None));

        debug!("Running {} › {} (attempt {})", suite.name, scenario.name, attempt);

        let page = match scenario.kind {
            ScenarioKind::Api => None,
            ScenarioKind::Browser => {
                let request = SessionRequest {
                    label: label.clone(),
                    artifact_dir: artifact_dir.clone(),
                };
                match self.factory.open(&request).await {
                    Ok(inner) => Some(Box::new(StepTracker {
                        inner,
                        label: label.clone(),
                        last: last_step.clone(),
                    }) as Box<dyn PageDriver>),
                    Err(e) => {
                        let failure = Failure {
                            kind: setup_kind(&e),
                            message: format!("session launch failed: {}", e),
                            expectation: None,
                        };
                        return (failed_attempt(attempt, start, failure, Vec::new()), None);
                    }
                }
            }
        };

        let mut ctx = ScenarioContext::new(
            suite.name.clone(),
            scenario.name.clone(),
            attempt,
            scenario.params.clone(),
            self.config.clone(),
            suite.selectors.clone(),
            page,
            self.api.clone(),
            artifact_dir.clone(),
        );
        if scenario.kind == ScenarioKind::Browser {
            ctx = ctx.with_factory(self.factory.clone());
        }

        let bound = scenario
            .timeout
            .or(suite.timeout)
            .unwrap_or_else(|| self.config.timeouts.scenario());

        let outcome = tokio::time::timeout(bound, execute(suite, scenario, &mut ctx)).await;
        let last = last_step.lock().map(|l| l.clone()).unwrap_or_default();

        let (failure, skip_reason) = match outcome {
            Ok(Ok(())) => (None, None),
            Ok(Err((_, E2eError::Skipped(reason)))) => (None, Some(reason)),
            Ok(Err((Phase::Setup, e))) => (
                Some(Failure {
                    kind: setup_kind(&e),
                    message: format!("before-each hook failed: {}", e),
                    expectation: last,
                }),
                None,
            ),
            Ok(Err((Phase::Body, e))) => (
                Some(Failure {
                    kind: FailureKind::of(&e),
                    message: e.to_string(),
                    expectation: last,
                }),
                None,
            ),
            Err(_) => (
                Some(Failure {
                    kind: FailureKind::Transient,
                    message: format!("scenario exceeded {} ms", bound.as_millis()),
                    expectation: last,
                }),
                None,
            ),
        };

        let artifacts = self.teardown(&mut ctx, &artifact_dir, failure.is_some()).await;
        // Leave no empty directory behind for attempts without artifacts
        let _ = std::fs::remove_dir(&artifact_dir);

        let result = match failure {
            Some(failure) => failed_attempt(attempt, start, failure, artifacts),
            None => AttemptResult {
                attempt,
                outcome: if skip_reason.is_some() { Outcome::Skipped } else { Outcome::Passed },
                duration_ms: start.elapsed().as_millis() as u64,
                failure: None,
                artifacts,
            },
        };
        (result, skip_reason)
    }

    /// Capture diagnostics and close the page
    async fn teardown(&self, ctx: &mut ScenarioContext, dir: &Path, failed: bool) -> Vec<Artifact> {
        let Some(page) = ctx.page.take() else {
            return Vec::new();
        };

        let policy = &self.config.artifacts;
        let bound = self.config.timeouts.navigation();
        let mut artifacts = Vec::new();

        if policy.screenshot.keep(failed) {
            let path = dir.join(if failed { "failure.png" } else { "final.png" });
            match tokio::time::timeout(bound, page.screenshot(&path, true)).await {
                Ok(Ok(path)) => push_artifact(&mut artifacts, ArtifactKind::Screenshot, &path),
                Ok(Err(e)) => warn!("Screenshot failed: {}", e),
                Err(_) => warn!("Screenshot timed out"),
            }
        }

        let trace_path = policy.trace.keep(failed).then(|| dir.join("trace.zip"));
        match tokio::time::timeout(bound, page.close(trace_path.as_deref())).await {
            Ok(Ok(closed)) => {
                if let Some(trace) = &trace_path {
                    push_artifact(&mut artifacts, ArtifactKind::Trace, trace);
                }
                if let Some(video) = closed.video {
                    if policy.video.keep(failed) {
                        push_artifact(&mut artifacts, ArtifactKind::Video, &video);
                    } else if let Err(e) = std::fs::remove_file(&video) {
                        debug!("Could not remove video {}: {}", video.display(), e);
                    }
                }
            }
            Ok(Err(e)) => warn!("Closing page failed: {}", e),
            Err(_) => warn!("Closing page timed out"),
        }

        if let Err(e) = page.shutdown().await {
            warn!("Driver shutdown failed: {}", e);
        }

        // Recordings live in a subdirectory that is empty once the video is dropped
        let _ = std::fs::remove_dir(dir.join("video"));
        artifacts
    }

    /// Write test results to JSON file
    pub fn write_results(&self, report: &SuiteReport) -> E2eResult<PathBuf> {
        report.write_json(&self.config.output_dir)
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Setup,
    Body,
}

async fn execute(suite: &Suite, scenario: &Scenario, ctx: &mut ScenarioContext) -> Result<(), (Phase, E2eError)> {
    if scenario.kind == ScenarioKind::Browser {
        if let Some(setup) = &suite.setup {
            setup(ctx).await.map_err(|e| (Phase::Setup, e))?;
        }
    }
    (scenario.body)(ctx).await.map_err(|e| (Phase::Body, e))
}

fn setup_kind(error: &E2eError) -> FailureKind {
    match FailureKind::of(error) {
        FailureKind::Config => FailureKind::Config,
        _ => FailureKind::Setup,
    }
}

fn failed_attempt(attempt: u32, start: Instant, failure: Failure, artifacts: Vec<Artifact>) -> AttemptResult {
    AttemptResult {
        attempt,
        outcome: Outcome::Failed,
        duration_ms: start.elapsed().as_millis() as u64,
        failure: Some(failure),
        artifacts,
    }
}

fn push_artifact(artifacts: &mut Vec<Artifact>, kind: ArtifactKind, path: &Path) {
    match Artifact::from_file(kind, path) {
        Ok(artifact) => artifacts.push(artifact),
        Err(e) => warn!("Missing {:?} artifact {}: {}", kind, path.display(), e),
    }
}

/// Session and artifact directory name for one attempt
///
/// The scenario's position in its suite keeps labels distinct when two names
/// slug to the same text or to nothing.
fn session_label(suite: &Suite, scenario: &Scenario, attempt: u32) -> String {
    let index = suite
        .scenarios()
        .iter()
        .position(|s| s.name == scenario.name)
        .unwrap_or(suite.len());
    let name = slug(&scenario.name);
    if name.is_empty() {
        format!("{}-{:03}-attempt{}", slug(&suite.name), index, attempt)
    } else {
        format!("{}-{:03}-{}-attempt{}", slug(&suite.name), index, name, attempt)
    }
}

/// File-system friendly form of a scenario name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Remembers the last step sent to a page so failures can name it
struct StepTracker {
    inner: Box<dyn PageDriver>,
    label: String,
    last: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl PageDriver for StepTracker {
    async fn execute(&self, command: Command) -> E2eResult<Value> {
        let step = command.label();
        debug!("[{}] {}", self.label, step);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(step);
        }
        self.inner.execute(command).await
    }

    async fn shutdown(&self) -> E2eResult<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactPolicy, CaptureMode};
    use crate::selectors::SelectorRegistry;
    use crate::testing::ScriptedFactory;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(dir: &Path) -> SuiteConfig {
        SuiteConfig {
            base_url: "https://example.test".to_string(),
            output_dir: dir.to_path_buf(),
            artifacts: ArtifactPolicy {
                screenshot: CaptureMode::Never,
                video: CaptureMode::Never,
                trace: CaptureMode::Never,
            },
            ..SuiteConfig::default()
        }
    }

    fn registry() -> SelectorRegistry {
        SelectorRegistry::from_pairs([
            ("username", "#username"),
            ("dashboard", "text=Dashboard"),
            ("error", ".error-message"),
        ])
        .unwrap()
    }

    async fn open_login(ctx: &mut ScenarioContext) -> E2eResult<()> {
        let page = ctx.page()?;
        page.goto("/login").await?;
        page.wait_visible(&ctx.sel("username")?, None).await
    }

    async fn sees_dashboard(ctx: &mut ScenarioContext) -> E2eResult<()> {
        ctx.page()?.expect_visible(&ctx.sel("dashboard")?).await
    }

    async fn sees_error(ctx: &mut ScenarioContext) -> E2eResult<()> {
        ctx.page()?.expect_contains_text(&ctx.sel("error")?, "Invalid credentials").await
    }

    async fn api_only(ctx: &mut ScenarioContext) -> E2eResult<()> {
        if ctx.has_page() {
            return Err(E2eError::AssertionFailed("api scenario got a page".to_string()));
        }
        Ok(())
    }

    fn suite() -> Suite {
        let mut suite = Suite::new("login", registry());
        suite.before_each(|ctx| Box::pin(open_login(ctx)));
        suite.scenario("valid login", |ctx| Box::pin(sees_dashboard(ctx))).tag("smoke");
        suite.scenario("invalid login", |ctx| Box::pin(sees_error(ctx)));
        suite.api_scenario("api list", |ctx| Box::pin(api_only(ctx)));
        suite.scenario("later", |ctx| Box::pin(sees_dashboard(ctx))).skip("not ready");
        suite
    }

    #[tokio::test]
    async fn test_each_scenario_gets_own_session() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        let runner = TestRunner::with_config(config(dir.path()), factory.clone()).unwrap();

        let report = runner.run(&[suite()]).await.unwrap();
        assert_eq!((report.passed, report.failed, report.skipped), (3, 0, 1));
        assert_eq!(report.results[0].name, "valid login");
        assert_eq!(report.results[3].outcome, Outcome::Skipped);

        // Two browser scenarios, each with a fresh page that ran the hook and was shut down
        let sessions = factory.sessions();
        assert_eq!(sessions.len(), 2);
        for (_, driver) in &sessions {
            assert_eq!(driver.labels()[0], "goto:/login");
            assert_eq!(driver.labels().last().unwrap(), "close");
            assert_eq!(driver.shutdowns(), 1);
        }
    }

    #[tokio::test]
    async fn test_assertion_failure_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::with(|_, _, driver| {
            driver.fail_on("expect:contains_text:", || {
                E2eError::AssertionFailed("missing 'Invalid credentials'".to_string())
            });
        }));
        let runner = TestRunner::with_config(config(dir.path()), factory.clone())
            .unwrap()
            .with_filter(ScenarioFilter {
                tags: vec![],
                grep: Some("invalid".to_string()),
            });

        let report = runner.run(&[suite()]).await.unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.failed, 1);
        let result = &report.results[0];
        assert_eq!(result.attempts.len(), 1);
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Assertion);
        assert_eq!(
            failure.expectation.as_deref(),
            Some("expect:contains_text:.error-message")
        );
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_then_pass_is_flaky() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::with(|_, opened, driver| {
            if opened == 0 {
                driver.fail_on("expect:visible:text=Dashboard", || {
                    E2eError::Timeout("Timeout 10000ms exceeded".to_string())
                });
            }
        }));
        let runner = TestRunner::with_config(config(dir.path()), factory)
            .unwrap()
            .with_filter(ScenarioFilter {
                tags: vec!["smoke".to_string()],
                grep: None,
            });

        let report = runner.run(&[suite()]).await.unwrap();
        assert_eq!(report.flaky, 1);
        assert_eq!(report.results[0].attempts.len(), 2);
        assert!(report.success());
    }

    #[tokio::test]
    async fn test_setup_failure_retried_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new().fail_opens(5));
        let mut cfg = config(dir.path());
        cfg.retries = 2;
        let runner = TestRunner::with_config(cfg, factory)
            .unwrap()
            .with_filter(ScenarioFilter {
                tags: vec!["smoke".to_string()],
                grep: None,
            });

        let report = runner.run(&[suite()]).await.unwrap();
        let result = &report.results[0];
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.attempts.len(), 3);
        assert_eq!(result.failure().unwrap().kind, FailureKind::Setup);
    }

    #[tokio::test]
    async fn test_scenario_timeout_captures_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.retries = 0;
        cfg.artifacts.screenshot = CaptureMode::OnFailure;
        let factory = Arc::new(ScriptedFactory::with(|request, _, driver| {
            // The scripted page writes the file the real driver would
            let path = request.artifact_dir.join("failure.png");
            std::fs::create_dir_all(&request.artifact_dir).unwrap();
            std::fs::write(&path, b"png").unwrap();
            driver.on("screenshot:", json!(null));
        }));

        async fn hangs(_ctx: &mut ScenarioContext) -> E2eResult<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        let mut slow = Suite::new("slow", SelectorRegistry::default());
        slow.scenario("hangs", |ctx| Box::pin(hangs(ctx)))
            .timeout(Duration::from_millis(50));

        let runner = TestRunner::with_config(cfg, factory.clone()).unwrap();
        let report = runner.run(&[slow]).await.unwrap();

        let result = &report.results[0];
        assert_eq!(result.outcome, Outcome::Failed);
        let failure = result.failure().unwrap();
        assert!(failure.message.contains("exceeded 50 ms"));
        let artifacts: Vec<_> = result.artifacts().collect();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].kind, ArtifactKind::Screenshot);

        let (_, driver) = &factory.sessions()[0];
        assert_eq!(driver.shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_skipped_from_body() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Arc::new(AtomicU32::new(0));

        let mut suite = Suite::new("homework-manager", SelectorRegistry::default());
        let counter = runs.clone();
        suite.api_scenario("needs api", move |_ctx| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                crate::suite::skip("API not deployed")
            })
        });

        let runner = TestRunner::with_config(config(dir.path()), Arc::new(ScriptedFactory::new())).unwrap();
        let report = runner.run(&[suite]).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.results[0].skip_reason.as_deref(), Some("API not deployed"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_fail_the_plan() {
        let dir = tempfile::tempdir().unwrap();
        let mut suite = suite();
        suite.scenario("valid login", |ctx| Box::pin(sees_dashboard(ctx)));
        let runner = TestRunner::with_config(config(dir.path()), Arc::new(ScriptedFactory::new())).unwrap();
        assert!(matches!(runner.plan(&[suite]), Err(E2eError::SuiteDefinition(_))));
    }

    #[tokio::test]
    async fn test_parallel_workers_keep_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.workers = 4;

        async fn sleepy(ctx: &mut ScenarioContext) -> E2eResult<()> {
            let ms: u64 = ctx.params().value("delay").unwrap_or("0").parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        }

        let mut suite = Suite::new("order", SelectorRegistry::default());
        suite.expand(
            (0..4)
                .map(|i| {
                    crate::fixtures::ScenarioParams::new(format!("case {}", i))
                        .with_value("delay", (40 - i * 10).to_string())
                })
                .collect(),
            |ctx| Box::pin(sleepy(ctx)),
        );

        let runner = TestRunner::with_config(cfg, Arc::new(ScriptedFactory::new())).unwrap();
        let report = runner.run(&[suite]).await.unwrap();
        let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["case 0", "case 1", "case 2", "case 3"]);
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("HM-UI-001: Page loads & shows list"), "hm-ui-001-page-loads-shows-list");
        assert_eq!(slug("filter Select Stream"), "filter-select-stream");
        assert_eq!(slug("日本語"), "");
    }

    #[tokio::test]
    async fn test_similar_names_get_distinct_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        let mut suite = Suite::new("columns", registry());
        suite.scenario("column visible: Created By", |ctx| Box::pin(sees_dashboard(ctx)));
        suite.scenario("column visible: Created-By", |ctx| Box::pin(sees_dashboard(ctx)));
        suite.scenario("日本語", |ctx| Box::pin(sees_dashboard(ctx)));
        suite.scenario("émoji ✓", |ctx| Box::pin(sees_dashboard(ctx)));
        suite.validate().unwrap();

        let runner = TestRunner::with_config(config(dir.path()), factory.clone()).unwrap();
        let report = runner.run(&[suite]).await.unwrap();
        assert_eq!(report.passed, 4);

        let mut labels: Vec<_> = factory.sessions().into_iter().map(|(request, _)| request.label).collect();
        labels.sort();
        assert_eq!(
            labels,
            vec![
                "columns-000-column-visible-created-by-attempt1",
                "columns-001-column-visible-created-by-attempt1",
                "columns-002-attempt1",
                "columns-003-moji-attempt1",
            ]
        );
    }
}
