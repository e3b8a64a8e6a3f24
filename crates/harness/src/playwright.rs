//! Playwright browser automation
//!
//! Each session is one `node` process running [`DRIVER_PROGRAM`]. It owns a
//! single browser context and page. Commands go in as JSON lines on stdin and
//! replies come back on stdout as lines prefixed with [`REPLY_MARKER`], so
//! anything else the process prints is ignored.
//!
//! The driver program runs commands as they arrive instead of queueing them.
//! Order within a scenario still holds because the Rust side awaits every
//! reply before sending the next command; the point is that a screenshot
//! can still be taken while a cancelled wait is pending.

use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Browser, SuiteConfig, Viewport};
use crate::driver::{Command, PageDriver, SessionFactory, SessionRequest};
use crate::error::{E2eError, E2eResult};

/// Prefix of every reply line written by the driver program
pub const REPLY_MARKER: &str = "@@e2e ";

/// Environment variable carrying [`DriverSettings`] as JSON
const SETTINGS_ENV: &str = "E2E_DRIVER_CONFIG";

static REPLY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@e2e (\{.*\})\s*$").expect("reply pattern"));

/// Node program driving one browser context
pub const DRIVER_PROGRAM: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const { expect } = require('@playwright/test');
const readline = require('readline');

const settings = JSON.parse(process.env.E2E_DRIVER_CONFIG);
let browser, context, page, closed = false;

function reply(id, ok, value, error) {
  const body = { id, ok, value: value === undefined ? null : value, error: error || null };
  process.stdout.write('@@e2e ' + JSON.stringify(body) + '\n');
}

function failure(err) {
  return {
    name: (err && err.name) || 'Error',
    message: (err && err.message) || String(err),
    assertion: !!(err && err.matcherResult),
  };
}

function opts(cmd) {
  return cmd.timeout_ms == null ? {} : { timeout: cmd.timeout_ms };
}

async function assertLocator(cmd) {
  let e = expect(page.locator(cmd.selector));
  if (cmd.negate) e = e.not;
  const x = cmd.expectation;
  const o = opts(cmd);
  switch (x.kind) {
    case 'visible': return e.toBeVisible(o);
    case 'hidden': return e.toBeHidden(o);
    case 'text': return e.toHaveText(x.text, o);
    case 'contains_text': return e.toContainText(x.text, o);
    case 'value': return e.toHaveValue(x.value, o);
    case 'attribute': return e.toHaveAttribute(x.name, x.value, o);
    case 'class_matches': return e.toHaveClass(new RegExp(x.pattern), o);
    case 'checked': return e.toBeChecked(o);
    case 'enabled': return e.toBeEnabled(o);
    case 'editable': return e.toBeEditable(o);
    case 'count': return e.toHaveCount(x.count, o);
    default: throw new Error('unknown expectation ' + x.kind);
  }
}

function option(o) {
  if (o.by === 'index') return { index: o.value };
  if (o.by === 'label') return { label: o.value };
  return o.value;
}

async function handle(cmd) {
  switch (cmd.op) {
    case 'goto': { await page.goto(cmd.url, { waitUntil: cmd.wait_until, ...opts(cmd) }); return null; }
    case 'wait_for_url': return page.waitForURL(cmd.pattern, opts(cmd));
    case 'wait_for_load_state': return page.waitForLoadState(cmd.state, opts(cmd));
    case 'wait_for': { await page.waitForSelector(cmd.selector, { state: cmd.state, ...opts(cmd) }); return null; }
    case 'click': return page.locator(cmd.selector).click(opts(cmd));
    case 'fill': return page.locator(cmd.selector).fill(cmd.value, opts(cmd));
    case 'type_text': return page.locator(cmd.selector).pressSequentially(cmd.text, opts(cmd));
    case 'press': return cmd.selector ? page.locator(cmd.selector).press(cmd.key) : page.keyboard.press(cmd.key);
    case 'check': return page.locator(cmd.selector).setChecked(cmd.checked);
    case 'select_option': { await page.locator(cmd.selector).selectOption(option(cmd.option)); return null; }
    case 'set_input_files': return page.locator(cmd.selector).setInputFiles(cmd.files, opts(cmd));
    case 'set_viewport': return page.setViewportSize({ width: cmd.width, height: cmd.height });
    case 'set_offline': return context.setOffline(cmd.offline);
    case 'go_back': { await page.goBack(); return null; }
    case 'go_forward': { await page.goForward(); return null; }
    case 'reload': { await page.reload(); return null; }
    case 'evaluate': return page.evaluate(cmd.expression);
    case 'wait_for_function': { await page.waitForFunction(cmd.expression, undefined, opts(cmd)); return null; }
    case 'expect': return assertLocator(cmd);
    case 'expect_title': return expect(page).toHaveTitle(new RegExp(cmd.pattern), opts(cmd));
    case 'count': return page.locator(cmd.selector).count();
    case 'text_contents': return page.locator(cmd.selector).allTextContents();
    case 'input_value': return page.locator(cmd.selector).inputValue(opts(cmd));
    case 'url': return page.url();
    case 'screenshot': { await page.screenshot({ path: cmd.path, fullPage: cmd.full_page }); return null; }
    case 'close': {
      if (settings.trace) await context.tracing.stop(cmd.trace_path ? { path: cmd.trace_path } : undefined);
      const video = page.video();
      await context.close();
      closed = true;
      return { video: video ? await video.path() : null };
    }
    default: throw new Error('unknown op ' + cmd.op);
  }
}

(async () => {
  const engine = { chromium, firefox, webkit }[settings.browser];
  browser = await engine.launch({ headless: settings.headless });
  const contextOptions = {
    viewport: settings.viewport,
    ignoreHTTPSErrors: settings.ignore_https_errors,
    baseURL: settings.base_url,
  };
  if (settings.video_dir) contextOptions.recordVideo = { dir: settings.video_dir, size: settings.viewport };
  context = await browser.newContext(contextOptions);
  context.setDefaultTimeout(settings.action_timeout_ms);
  context.setDefaultNavigationTimeout(settings.navigation_timeout_ms);
  if (settings.trace) await context.tracing.start({ screenshots: true, snapshots: true, sources: true });
  page = await context.newPage();
  reply(0, true, 'ready');

  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  rl.on('line', (line) => {
    if (!line.trim()) return;
    let cmd;
    try { cmd = JSON.parse(line); } catch (err) { reply(-1, false, null, failure(err)); return; }
    handle(cmd).then(
      (value) => reply(cmd.id, true, value),
      (err) => reply(cmd.id, false, null, failure(err)),
    );
  });
  rl.on('close', async () => {
    if (!closed) await context.close().catch(() => {});
    await browser.close().catch(() => {});
    process.exit(0);
  });
})().catch((err) => {
  reply(0, false, null, failure(err));
  process.exit(1);
});
"#;

/// Settings handed to the driver program
#[derive(Debug, Clone, Serialize)]
pub struct DriverSettings {
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    pub ignore_https_errors: bool,
    pub base_url: String,
    pub action_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub video_dir: Option<String>,
    pub trace: bool,
}

impl DriverSettings {
    pub fn for_session(config: &SuiteConfig, artifact_dir: &Path) -> Self {
        let video_dir = config
            .artifacts
            .video
            .records()
            .then(|| artifact_dir.join("video").to_string_lossy().into_owned());

        Self {
            browser: config.browser,
            headless: config.headless,
            viewport: config.viewport,
            ignore_https_errors: config.ignore_https_errors,
            base_url: config.base_url.clone(),
            action_timeout_ms: config.timeouts.action_ms,
            navigation_timeout_ms: config.timeouts.navigation_ms,
            video_dir,
            trace: config.artifacts.trace.records(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a Command,
}

/// One reply line from the driver program
#[derive(Debug, Clone, Deserialize)]
pub struct DriverReply {
    pub id: i64,
    pub ok: bool,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<DriverFailure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverFailure {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub assertion: bool,
}

impl DriverReply {
    /// Map the reply onto the harness error taxonomy
    pub fn into_result(self, label: &str) -> E2eResult<Value> {
        if self.ok {
            return Ok(self.value);
        }

        let failure = self.error.unwrap_or_default();
        let message = format!("{}: {}", label, first_line(&failure.message));
        if failure.assertion {
            Err(E2eError::AssertionFailed(message))
        } else if failure.name == "TimeoutError" {
            Err(E2eError::Timeout(message))
        } else {
            Err(E2eError::Driver(message))
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().find(|l| !l.trim().is_empty()).unwrap_or(message).trim()
}

/// Parse a stdout line; `None` for lines that are not replies
pub fn parse_reply(line: &str) -> Option<E2eResult<DriverReply>> {
    let caps = REPLY_LINE.captures(line)?;
    Some(serde_json::from_str(&caps[1]).map_err(E2eError::from))
}

struct DriverIo {
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl DriverIo {
    /// Read until the reply for `id` arrives
    async fn read_reply(&mut self, id: i64) -> E2eResult<DriverReply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::SessionClosed("driver exited".to_string()))?;

            match parse_reply(&line) {
                Some(Ok(reply)) if reply.id == id => return Ok(reply),
                Some(Ok(reply)) => debug!("Dropping stale reply {}", reply.id),
                Some(Err(e)) => warn!("Unreadable driver reply: {}", e),
                None => debug!("[driver] {}", line),
            }
        }
    }
}

/// A browser context owned by one scenario attempt
pub struct PlaywrightSession {
    label: String,
    io: Mutex<DriverIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
}

impl PlaywrightSession {
    /// Spawn the driver program and wait until the page is ready
    pub async fn launch(
        settings: &DriverSettings,
        node_project_dir: &Path,
        label: &str,
        startup_timeout: Duration,
    ) -> E2eResult<Self> {
        let settings_json = serde_json::to_string(settings)?;

        let mut child = TokioCommand::new("node")
            .arg("-e")
            .arg(DRIVER_PROGRAM)
            .current_dir(node_project_dir)
            .env(SETTINGS_ENV, settings_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let label = label.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver {}] {}", label, line);
                }
            });
        }

        let mut io = DriverIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = tokio::time::timeout(startup_timeout, io.read_reply(0))
            .await
            .map_err(|_| E2eError::Timeout(format!("browser launch for {}", label)))??;
        ready.into_result("launch")?;

        debug!("Browser session ready: {}", label);

        Ok(Self {
            label: label.to_string(),
            io: Mutex::new(io),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl PageDriver for PlaywrightSession {
    async fn execute(&self, command: Command) -> E2eResult<Value> {
        command.validate()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let label = command.label();
        let mut line = serde_json::to_string(&Request { id, command: &command })?;
        line.push('\n');

        debug!("[{}] -> {}", self.label, label);

        let mut io = self.io.lock().await;
        let stdin = io
            .stdin
            .as_mut()
            .ok_or_else(|| E2eError::SessionClosed(self.label.clone()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        let reply = io.read_reply(id as i64).await?;
        reply.into_result(&label)
    }

    async fn shutdown(&self) -> E2eResult<()> {
        // Closing stdin lets the driver close the browser on its own
        self.io.lock().await.stdin.take();

        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_secs(10), child.wait()).await {
            Ok(status) => {
                debug!("Driver for {} exited: {:?}", self.label, status?);
                return Ok(());
            }
            Err(_) => warn!("Driver for {} did not exit, terminating", self.label),
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), child.wait()).await.is_ok()
                {
                    return Ok(());
                }
            }
        }

        let _ = child.kill().await;
        Ok(())
    }
}

/// Opens Playwright sessions for the runner
pub struct PlaywrightLauncher {
    config: Arc<SuiteConfig>,
}

impl PlaywrightLauncher {
    /// Create a launcher, verifying Playwright is resolvable
    pub fn new(config: Arc<SuiteConfig>) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.node_project_dir)?;
        info!(
            "Using {} ({}) against {}",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" },
            config.base_url
        );
        Ok(Self { config })
    }

    /// Check that `playwright` and `@playwright/test` resolve from the project dir
    fn check_playwright_installed(dir: &Path) -> E2eResult<()> {
        let status = StdCommand::new("node")
            .args([
                "-e",
                "require.resolve('playwright'); require.resolve('@playwright/test')",
            ])
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightLauncher {
    async fn open(&self, request: &SessionRequest) -> E2eResult<Box<dyn PageDriver>> {
        std::fs::create_dir_all(&request.artifact_dir)?;
        let settings = DriverSettings::for_session(&self.config, &request.artifact_dir);
        let session = PlaywrightSession::launch(
            &settings,
            &self.config.node_project_dir,
            &request.label,
            self.config.timeouts.navigation(),
        )
        .await?;
        Ok(Box::new(session))
    }
}
