//! Suites, scenarios and the context a scenario body runs against
//!
//! A [`Suite`] is built in code: a before-each hook plus a list of named
//! scenarios, some of them expanded from fixture catalogs. Bodies are boxed
//! async closures taking the [`ScenarioContext`] of the current attempt:
//!
//! ```ignore
//! let mut suite = Suite::new("login", selectors);
//! suite.before_each(|ctx| Box::pin(open_login_page(ctx)));
//! suite.scenario("valid login", |ctx| Box::pin(valid_login(ctx)))
//!     .tag("smoke");
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::api::ApiClient;
use crate::config::SuiteConfig;
use crate::driver::{PageDriver, SessionFactory, SessionRequest};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{FixtureDescriptor, ScenarioParams};
use crate::selectors::SelectorRegistry;

/// Boxed async body of a scenario or hook
pub type ScenarioFn = Arc<dyn for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>> + Send + Sync>;

/// Whether a scenario needs a browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Gets a fresh page and runs after the suite's before-each hook
    Browser,
    /// HTTP only; no page is opened and the hook is not run
    Api,
}

pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub kind: ScenarioKind,
    /// Overrides the suite and config bound
    pub timeout: Option<Duration>,
    /// Overrides the configured retry count
    pub retries: Option<u32>,
    /// Reason the scenario is not run
    pub skip: Option<String>,
    pub params: ScenarioParams,
    pub(crate) body: ScenarioFn,
}

impl Scenario {
    fn new(name: impl Into<String>, kind: ScenarioKind, params: ScenarioParams, body: ScenarioFn) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            kind,
            timeout: None,
            retries: None,
            skip: None,
            params,
            body,
        }
    }

    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.push(tag.into());
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(&mut self, retries: u32) -> &mut Self {
        self.retries = Some(retries);
        self
    }

    pub fn skip(&mut self, reason: impl Into<String>) -> &mut Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("kind", &self.kind)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

/// Named group of scenarios sharing a selector table and a setup hook
pub struct Suite {
    pub name: String,
    pub selectors: Arc<SelectorRegistry>,
    /// Bound for every scenario of the suite
    pub timeout: Option<Duration>,
    pub(crate) setup: Option<ScenarioFn>,
    scenarios: Vec<Scenario>,
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("scenarios", &self.scenarios)
            .finish_non_exhaustive()
    }
}

impl Suite {
    pub fn new(name: impl Into<String>, selectors: SelectorRegistry) -> Self {
        Self {
            name: name.into(),
            selectors: Arc::new(selectors),
            timeout: None,
            setup: None,
            scenarios: Vec::new(),
        }
    }

    /// Hook run on the fresh page before each browser scenario
    pub fn before_each<F>(&mut self, hook: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(hook));
        self
    }

    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn scenario<F>(&mut self, name: impl Into<String>, body: F) -> &mut Scenario
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>> + Send + Sync + 'static,
    {
        self.push(Scenario::new(name, ScenarioKind::Browser, ScenarioParams::default(), Arc::new(body)))
    }

    pub fn api_scenario<F>(&mut self, name: impl Into<String>, body: F) -> &mut Scenario
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>> + Send + Sync + 'static,
    {
        self.push(Scenario::new(name, ScenarioKind::Api, ScenarioParams::default(), Arc::new(body)))
    }

    /// One browser scenario per parameter set, named after its title
    pub fn expand<F>(&mut self, params: Vec<ScenarioParams>, body: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>> + Send + Sync + 'static,
    {
        let body: ScenarioFn = Arc::new(body);
        for p in params {
            let name = p.title.clone();
            self.push(Scenario::new(name, ScenarioKind::Browser, p, body.clone()));
        }
        self
    }

    fn push(&mut self, scenario: Scenario) -> &mut Scenario {
        self.scenarios.push(scenario);
        let last = self.scenarios.len() - 1;
        &mut self.scenarios[last]
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Reject suites whose scenarios cannot be told apart
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SuiteDefinition("suite without a name".to_string()));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                return Err(E2eError::SuiteDefinition(format!(
                    "scenario without a name in suite '{}'",
                    self.name
                )));
            }
            if !seen.insert(scenario.name.as_str()) {
                return Err(E2eError::SuiteDefinition(format!(
                    "duplicate scenario '{}' in suite '{}'",
                    scenario.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Everything one scenario attempt can reach
pub struct ScenarioContext {
    suite: String,
    scenario: String,
    attempt: u32,
    params: ScenarioParams,
    config: Arc<SuiteConfig>,
    selectors: Arc<SelectorRegistry>,
    pub(crate) page: Option<Box<dyn PageDriver>>,
    api: ApiClient,
    artifact_dir: PathBuf,
    factory: Option<Arc<dyn SessionFactory>>,
    extra_pages: usize,
}

impl ScenarioContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        suite: impl Into<String>,
        scenario: impl Into<String>,
        attempt: u32,
        params: ScenarioParams,
        config: Arc<SuiteConfig>,
        selectors: Arc<SelectorRegistry>,
        page: Option<Box<dyn PageDriver>>,
        api: ApiClient,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            suite: suite.into(),
            scenario: scenario.into(),
            attempt,
            params,
            config,
            selectors,
            page,
            api,
            artifact_dir,
            factory: None,
            extra_pages: 0,
        }
    }

    /// Allow the scenario to open additional pages
    pub fn with_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Open another isolated page, e.g. a second user editing concurrently
    ///
    /// The page is not signed in and belongs to the caller, who must close
    /// and shut it down.
    pub async fn open_page(&mut self) -> E2eResult<Box<dyn PageDriver>> {
        let factory = self.factory.clone().ok_or_else(|| {
            E2eError::Config(format!("scenario '{}' cannot open extra pages", self.scenario))
        })?;
        self.extra_pages += 1;
        let request = SessionRequest {
            label: format!("{}-extra{}", self.scenario, self.extra_pages),
            artifact_dir: self.artifact_dir.join(format!("extra{}", self.extra_pages)),
        };
        factory.open(&request).await
    }

    /// The attempt's page; API scenarios have none
    pub fn page(&self) -> E2eResult<&dyn PageDriver> {
        self.page.as_deref().ok_or_else(|| {
            E2eError::Config(format!("scenario '{}' has no browser page", self.scenario))
        })
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    /// Resolve a selector, failing on unknown names or missing parameters
    pub fn sel(&self, name: &str) -> E2eResult<String> {
        self.selectors.require(name, &[])
    }

    pub fn sel_with(&self, name: &str, params: &[(&str, &str)]) -> E2eResult<String> {
        self.selectors.require(name, params)
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ScenarioParams {
        &mut self.params
    }

    /// Descriptor the scenario was expanded from
    pub fn fixture(&self) -> E2eResult<&FixtureDescriptor> {
        self.params.fixture.as_ref().ok_or_else(|| {
            E2eError::SuiteDefinition(format!("scenario '{}' is not fixture-driven", self.scenario))
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Absolute URL for an application path
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn suite_name(&self) -> &str {
        &self.suite
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// End the scenario as skipped
pub fn skip(reason: impl Into<String>) -> E2eResult<()> {
    Err(E2eError::Skipped(reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FieldKind, FixtureDescriptor};

    async fn noop(_ctx: &mut ScenarioContext) -> E2eResult<()> {
        Ok(())
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut suite = Suite::new("login", SelectorRegistry::default());
        suite.scenario("valid login", |ctx| Box::pin(noop(ctx)));
        suite.scenario("valid login", |ctx| Box::pin(noop(ctx)));

        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate scenario 'valid login'"));
    }

    #[test]
    fn test_expand_one_scenario_per_params() {
        let params = vec![
            ScenarioParams::for_fixture(
                "filter Select Stream",
                FixtureDescriptor::new("Select Stream", FieldKind::Dropdown).mandatory(),
            ),
            ScenarioParams::for_fixture(
                "filter Search",
                FixtureDescriptor::new("Search", FieldKind::FreeText),
            ),
        ];

        let mut suite = Suite::new("homework-new", SelectorRegistry::default());
        suite.expand(params, |ctx| Box::pin(noop(ctx)));
        suite.api_scenario("list", |ctx| Box::pin(noop(ctx))).tag("api");

        assert_eq!(suite.len(), 3);
        suite.validate().unwrap();
        assert_eq!(suite.scenarios()[0].name, "filter Select Stream");
        assert!(suite.scenarios()[0].params.fixture.as_ref().unwrap().mandatory);
        assert_eq!(suite.scenarios()[2].kind, ScenarioKind::Api);
        assert!(suite.scenarios()[2].has_tag("api"));
    }

    #[test]
    fn test_context_without_page() {
        let config = Arc::new(SuiteConfig::default());
        let api = ApiClient::new(&config).unwrap();
        let ctx = ScenarioContext::new(
            "homework-manager",
            "list",
            1,
            ScenarioParams::default(),
            config,
            Arc::new(SelectorRegistry::default()),
            None,
            api,
            PathBuf::from("test-results/x"),
        );
        assert!(matches!(ctx.page(), Err(E2eError::Config(_))));
        assert!(matches!(ctx.fixture(), Err(E2eError::SuiteDefinition(_))));
        assert!(matches!(ctx.sel("missing"), Err(E2eError::UnknownSelector(_))));
    }
}
