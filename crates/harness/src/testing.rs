//! In-memory driver for exercising helpers and suites without a browser

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::driver::{Command, PageDriver, SessionFactory, SessionRequest};
use crate::error::{E2eError, E2eResult};

type ErrorFn = Arc<dyn Fn() -> E2eError + Send + Sync>;

enum Reply {
    Value(Value),
    Fail(ErrorFn),
}

struct Rule {
    prefix: String,
    reply: Reply,
    remaining: Option<usize>,
}

/// Records every command and answers from a list of rules
///
/// Rules match on the command label prefix (`"click:#save"`, `"count:"`);
/// the first live rule wins. Unmatched commands succeed with a neutral value.
#[derive(Default)]
pub struct ScriptedDriver {
    log: Mutex<Vec<Command>>,
    rules: Mutex<Vec<Rule>>,
    shutdowns: AtomicUsize,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, prefix: &str, reply: Reply, remaining: Option<usize>) -> &Self {
        self.rules.lock().expect("rules lock").push(Rule {
            prefix: prefix.to_string(),
            reply,
            remaining,
        });
        self
    }

    /// Answer matching commands with `value`
    pub fn on(&self, prefix: &str, value: Value) -> &Self {
        self.push(prefix, Reply::Value(value), None)
    }

    /// Answer only the next `times` matching commands with `value`
    pub fn on_times(&self, prefix: &str, times: usize, value: Value) -> &Self {
        self.push(prefix, Reply::Value(value), Some(times))
    }

    /// Fail every matching command
    pub fn fail_on(&self, prefix: &str, error: impl Fn() -> E2eError + Send + Sync + 'static) -> &Self {
        self.push(prefix, Reply::Fail(Arc::new(error)), None)
    }

    /// Fail only the next `times` matching commands
    pub fn fail_times(
        &self,
        prefix: &str,
        times: usize,
        error: impl Fn() -> E2eError + Send + Sync + 'static,
    ) -> &Self {
        self.push(prefix, Reply::Fail(Arc::new(error)), Some(times))
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.commands().iter().map(Command::label).collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn default_reply(command: &Command) -> Value {
        match command {
            Command::Count { .. } => json!(1),
            Command::TextContents { .. } => json!([]),
            Command::InputValue { .. } => json!(""),
            Command::Url => json!("about:blank"),
            Command::Close { .. } => json!({ "video": null }),
            _ => Value::Null,
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn execute(&self, command: Command) -> E2eResult<Value> {
        command.validate()?;
        let label = command.label();
        self.log.lock().expect("log lock").push(command.clone());

        let mut rules = self.rules.lock().expect("rules lock");
        for rule in rules.iter_mut() {
            if !label.starts_with(&rule.prefix) || rule.remaining == Some(0) {
                continue;
            }
            if let Some(n) = rule.remaining.as_mut() {
                *n -= 1;
            }
            return match &rule.reply {
                Reply::Value(value) => Ok(value.clone()),
                Reply::Fail(make) => Err(make()),
            };
        }

        Ok(Self::default_reply(&command))
    }

    async fn shutdown(&self) -> E2eResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Configure = Box<dyn Fn(&SessionRequest, usize, &ScriptedDriver) + Send + Sync>;

/// Hands out a fresh [`ScriptedDriver`] per session and keeps them for inspection
pub struct ScriptedFactory {
    configure: Configure,
    sessions: Mutex<Vec<(SessionRequest, Arc<ScriptedDriver>)>>,
    failing_opens: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::with(|_, _, _| {})
    }

    /// Configure each new driver; the `usize` is the number of sessions opened before it
    pub fn with(configure: impl Fn(&SessionRequest, usize, &ScriptedDriver) + Send + Sync + 'static) -> Self {
        Self {
            configure: Box::new(configure),
            sessions: Mutex::new(Vec::new()),
            failing_opens: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` opens fail with a timeout
    pub fn fail_opens(self, n: usize) -> Self {
        self.failing_opens.store(n, Ordering::SeqCst);
        self
    }

    pub fn sessions(&self) -> Vec<(SessionRequest, Arc<ScriptedDriver>)> {
        self.sessions.lock().expect("sessions lock").clone()
    }
}

impl Default for ScriptedFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open(&self, request: &SessionRequest) -> E2eResult<Box<dyn PageDriver>> {
        let pending = self.failing_opens.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_opens.store(pending - 1, Ordering::SeqCst);
            return Err(E2eError::Timeout(format!("browser launch for {}", request.label)));
        }

        let driver = Arc::new(ScriptedDriver::new());
        let mut sessions = self.sessions.lock().expect("sessions lock");
        (self.configure)(request, sessions.len(), &driver);
        sessions.push((request.clone(), driver.clone()));
        Ok(Box::new(driver))
    }
}
