//! Catalog-driven suite run end to end against the scripted driver

use std::sync::Arc;

use okiedokie_harness::config::CaptureMode;
use okiedokie_harness::fixtures::Category;
use okiedokie_harness::helpers::{verify_field, FormControls};
use okiedokie_harness::report::{FailureKind, Outcome, RESULTS_FILE};
use okiedokie_harness::testing::ScriptedFactory;
use okiedokie_harness::{
    E2eError, E2eResult, FixtureCatalog, ScenarioContext, SelectorRegistry, Suite, SuiteConfig, SuiteReport,
    TestRunner,
};

const CATALOG: &str = r#"
functionality:
  filters:
    - { name: Select Stream, type: dropdown, mandatory: true }
    - { name: Select Subject, type: dropdown, mandatory: true }
    - { name: Remarks }
"#;

fn registry() -> SelectorRegistry {
    SelectorRegistry::from_pairs([
        ("field", r#"[formControlName="{control}"]"#),
        ("save", "button#save"),
        ("error", ".error-message"),
        ("success", ".toast-success"),
    ])
    .unwrap()
}

async fn field_check(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let descriptor = ctx.fixture()?;
    let selector = ctx.sel_with("field", &[("control", &descriptor.control_name())])?;
    let form = FormControls {
        submit: ctx.sel("save")?,
        error: ctx.sel("error")?,
        success: ctx.sel("success")?,
    };
    verify_field(ctx.page()?, &selector, descriptor, &form).await
}

fn suite(catalog: &FixtureCatalog) -> Suite {
    let mut suite = Suite::new("catalog", registry());
    suite.expand(
        catalog.scenario_params(Category::Filter, |d| format!("field: {}", d.name)),
        |ctx| Box::pin(field_check(ctx)),
    );
    suite
}

#[tokio::test]
async fn test_catalog_expands_runs_and_reports() {
    let fixtures = tempfile::tempdir().unwrap();
    std::fs::write(fixtures.path().join("form.yaml"), CATALOG).unwrap();
    let catalogs = FixtureCatalog::load_all(fixtures.path()).unwrap();
    assert_eq!(catalogs.len(), 1);

    // The subject dropdown accepts an empty value: no error appears
    let factory = Arc::new(ScriptedFactory::with(|request, _, driver| {
        if request.label.contains("select-subject") {
            // The scripted page writes the file the real driver would
            std::fs::create_dir_all(&request.artifact_dir).unwrap();
            std::fs::write(request.artifact_dir.join("failure.png"), b"png").unwrap();
            driver.fail_on("expect:visible:.error-message", || {
                E2eError::AssertionFailed("element not visible".to_string())
            });
        }
    }));

    let output = tempfile::tempdir().unwrap();
    let mut config = SuiteConfig {
        output_dir: output.path().to_path_buf(),
        workers: 2,
        ..SuiteConfig::default()
    };
    config.artifacts.video = CaptureMode::Never;
    config.artifacts.trace = CaptureMode::Never;

    let runner = TestRunner::with_config(config, factory.clone()).unwrap();
    let report = runner.run(&[suite(&catalogs[0])]).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.exit_code(), 1);

    let failed = report.failures().next().unwrap();
    assert_eq!(failed.name, "field: Select Subject");
    // Assertion failures are not retried
    assert_eq!(failed.attempts.len(), 1);
    let failure = failed.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.expectation.as_deref(), Some("expect:visible:.error-message"));
    assert!(failure.message.contains("Select Subject"), "{}", failure.message);
    assert!(failed.artifacts().any(|a| a.path.ends_with("failure.png")));

    // Optional field: presence checks only
    let remarks = report.results.iter().find(|r| r.name == "field: Remarks").unwrap();
    assert_eq!(remarks.outcome, Outcome::Passed);

    let path = runner.write_results(&report).unwrap();
    assert_eq!(path, output.path().join(RESULTS_FILE));
    let reread = SuiteReport::read_json(&path).unwrap();
    assert_eq!(reread.failed, 1);
    assert_eq!(reread.results.len(), 3);
    assert!(report.render_list().contains("✗ catalog › field: Select Subject"));
}
