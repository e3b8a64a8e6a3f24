//! Reusable interactions built on the driver and the selector registry

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{UploadFailurePolicy, Viewport};
use crate::driver::{PageDriver, SelectBy};
use crate::error::{E2eError, E2eResult};
use crate::fixtures::{FieldKind, FixtureDescriptor};
use crate::selectors::SelectorRegistry;

/// Outcome of a multi-file upload
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub uploaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn tolerated failures back into an error
    pub fn into_result(self) -> E2eResult<Self> {
        match self.failed.first() {
            None => Ok(self),
            Some((file, reason)) => Err(E2eError::Upload {
                file: file.display().to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

fn base_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// Attach files one by one, confirming each through its uploaded indicator
///
/// `indicator` names a registry entry with a `{file}` placeholder that is
/// filled with the file's base name. With [`UploadFailurePolicy::LogAndContinue`]
/// a failing file is logged and recorded in the report while the remaining
/// files are still uploaded; configuration errors always propagate.
pub async fn upload_files(
    page: &dyn PageDriver,
    selectors: &SelectorRegistry,
    input: &str,
    indicator: &str,
    files: &[PathBuf],
    policy: UploadFailurePolicy,
) -> E2eResult<UploadReport> {
    let mut report = UploadReport::default();

    for file in files {
        let name = base_name(file);
        let indicator = selectors.require(indicator, &[("file", &name)])?;

        let attempt = async {
            page.wait_visible(input, None).await?;
            page.set_input_files(input, std::slice::from_ref(file), None).await?;
            page.expect_visible(&indicator).await
        };

        match attempt.await {
            Ok(()) => {
                debug!("Uploaded {}", name);
                report.uploaded.push(file.clone());
            }
            Err(e @ (E2eError::Config(_) | E2eError::UnknownSelector(_))) => return Err(e),
            Err(e) => match policy {
                UploadFailurePolicy::Strict => {
                    return Err(E2eError::Upload {
                        file: file.display().to_string(),
                        reason: e.to_string(),
                    })
                }
                UploadFailurePolicy::LogAndContinue => {
                    warn!("File upload failed: {}: {}", file.display(), e);
                    report.failed.push((file.clone(), e.to_string()));
                }
            },
        }
    }

    Ok(report)
}

/// Click a theme control and wait until `root` carries the theme class
pub async fn toggle_theme(
    page: &dyn PageDriver,
    toggle: &str,
    root: &str,
    theme: &str,
    timeout: Duration,
) -> E2eResult<()> {
    page.wait_visible(toggle, None).await?;
    page.click(toggle).await?;

    let expression = format!(
        "(() => {{ const el = document.querySelector({}); return !!el && el.classList.contains({}); }})()",
        serde_json::to_string(root)?,
        serde_json::to_string(theme)?,
    );
    page.wait_for_function(&expression, Some(timeout))
        .await
        .map_err(|e| match e {
            E2eError::Timeout(msg) => E2eError::Timeout(format!("theme '{}' on {}: {}", theme, root, msg)),
            other => other,
        })?;

    page.expect_class(root, &format!(r"(^|\s){}(\s|$)", regex::escape(theme)))
        .await?;
    info!("Theme switched to {}", theme);
    Ok(())
}

/// Emulate another screen size, optionally reloading a page under it
pub async fn resize_viewport(page: &dyn PageDriver, viewport: Viewport, renavigate: Option<&str>) -> E2eResult<()> {
    debug!("Resizing viewport to {}x{}", viewport.width, viewport.height);
    page.set_viewport(viewport).await?;
    if let Some(url) = renavigate {
        page.goto(url).await?;
    }
    Ok(())
}

/// Date string accepted by the application's date pickers
pub fn date_picker_value(date: chrono::NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Today's date in date-picker form
pub fn today_for_date_picker() -> String {
    date_picker_value(chrono::Local::now().date_naive())
}

/// Put a value into a field according to its kind
///
/// Dropdowns take an option index when `value` is numeric and a label
/// otherwise; checkboxes are checked for `true`/`yes`/`1`; file fields take a
/// path.
pub async fn fill_field(page: &dyn PageDriver, selector: &str, kind: FieldKind, value: &str) -> E2eResult<()> {
    match kind {
        FieldKind::Dropdown => {
            let option = match value.parse::<usize>() {
                Ok(index) => SelectBy::Index(index),
                Err(_) => SelectBy::Label(value.to_string()),
            };
            page.select_option(selector, option).await
        }
        FieldKind::Checkbox => {
            if matches!(value, "true" | "yes" | "1") {
                page.check(selector).await
            } else {
                page.uncheck(selector).await
            }
        }
        FieldKind::File => page.set_input_files(selector, &[PathBuf::from(value)], None).await,
        FieldKind::DatePicker | FieldKind::FreeText | FieldKind::TextArea => page.fill(selector, value).await,
    }
}

/// Empty a field according to its kind
pub async fn clear_field(page: &dyn PageDriver, selector: &str, kind: FieldKind) -> E2eResult<()> {
    match kind {
        // First option is the placeholder
        FieldKind::Dropdown => page.select_option(selector, SelectBy::Index(0)).await,
        FieldKind::Checkbox => page.uncheck(selector).await,
        FieldKind::File => page.set_input_files(selector, &[], None).await,
        FieldKind::DatePicker | FieldKind::FreeText | FieldKind::TextArea => page.fill(selector, "").await,
    }
}

/// Controls involved in submitting a form
#[derive(Debug, Clone)]
pub struct FormControls {
    pub submit: String,
    /// Validation error region
    pub error: String,
    /// Element that only appears after a successful submit
    pub success: String,
}

/// Check a field is present and, when mandatory, that an empty value is rejected
pub async fn verify_field(
    page: &dyn PageDriver,
    selector: &str,
    descriptor: &FixtureDescriptor,
    form: &FormControls,
) -> E2eResult<()> {
    page.wait_visible(selector, None).await?;
    page.expect_visible(selector).await?;

    if !descriptor.mandatory {
        return Ok(());
    }

    clear_field(page, selector, descriptor.kind).await?;
    page.click(&form.submit).await?;
    page.expect_visible(&form.error).await.map_err(|e| match e {
        E2eError::AssertionFailed(msg) => E2eError::AssertionFailed(format!(
            "empty mandatory field '{}' was not rejected: {}",
            descriptor.name, msg
        )),
        other => other,
    })?;
    page.expect_hidden(&form.success).await
}

/// Check a read-only field has the attribute and ignores both typing and
/// programmatic fills
pub async fn verify_read_only(page: &dyn PageDriver, selector: &str, probe_timeout: Duration) -> E2eResult<()> {
    page.expect_attribute(selector, "readonly", "").await?;

    let before = page.input_value(selector).await?;

    tolerate_refusal(page.type_text(selector, "x", Some(probe_timeout)).await)?;
    ensure_unchanged(page, selector, &before, "typing").await?;

    tolerate_refusal(page.fill_within(selector, "x", probe_timeout).await)?;
    ensure_unchanged(page, selector, &before, "fill").await
}

/// A page refusing input on a read-only field is the expected outcome
fn tolerate_refusal(result: E2eResult<()>) -> E2eResult<()> {
    match result {
        Ok(()) | Err(E2eError::Timeout(_)) | Err(E2eError::Driver(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn ensure_unchanged(page: &dyn PageDriver, selector: &str, before: &str, entry: &str) -> E2eResult<()> {
    let after = page.input_value(selector).await?;
    if after != before {
        return Err(E2eError::AssertionFailed(format!(
            "read-only field '{}' changed from {:?} to {:?} after {}",
            selector, before, after, entry
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Command;
    use crate::testing::ScriptedDriver;
    use serde_json::json;

    fn registry() -> SelectorRegistry {
        SelectorRegistry::from_pairs([("uploaded_file", ".uploaded-file:has-text(\"{file}\")")]).unwrap()
    }

    fn files() -> Vec<PathBuf> {
        vec![
            PathBuf::from("tests/sample.pdf"),
            PathBuf::from("tests/broken.png"),
            PathBuf::from("tests/notes.txt"),
        ]
    }

    #[tokio::test]
    async fn test_upload_continues_past_failure() {
        let driver = ScriptedDriver::new();
        driver.fail_on("expect:visible:.uploaded-file:has-text(\"broken.png\")", || {
            E2eError::AssertionFailed("not visible".to_string())
        });

        let report = upload_files(
            &driver,
            &registry(),
            "input[type=file]",
            "uploaded_file",
            &files(),
            UploadFailurePolicy::LogAndContinue,
        )
        .await
        .unwrap();

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("tests/broken.png"));
        assert!(!report.is_complete());
        assert!(report.clone().into_result().is_err());

        let attached = driver
            .commands()
            .into_iter()
            .filter(|c| matches!(c, Command::SetInputFiles { .. }))
            .count();
        assert_eq!(attached, 3);
    }

    #[tokio::test]
    async fn test_upload_strict_stops_at_first_failure() {
        let driver = ScriptedDriver::new();
        driver.fail_on("set_input_files:", || E2eError::Timeout("not attachable".to_string()));

        let err = upload_files(
            &driver,
            &registry(),
            "input[type=file]",
            "uploaded_file",
            &files(),
            UploadFailurePolicy::Strict,
        )
        .await
        .unwrap_err();

        match err {
            E2eError::Upload { file, .. } => assert_eq!(file, "tests/sample.pdf"),
            other => panic!("expected upload error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_unknown_indicator_is_config_error() {
        let driver = ScriptedDriver::new();
        let err = upload_files(
            &driver,
            &registry(),
            "input[type=file]",
            "missing_indicator",
            &files(),
            UploadFailurePolicy::LogAndContinue,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::UnknownSelector(_)));
        assert!(driver.commands().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_theme_waits_then_asserts() {
        let driver = ScriptedDriver::new();
        toggle_theme(&driver, "button:has-text(\"Theme Toggle\")", "body", "dark", Duration::from_secs(5))
            .await
            .unwrap();

        let commands = driver.commands();
        assert_eq!(commands.len(), 4);
        match &commands[2] {
            Command::WaitForFunction { expression, timeout_ms } => {
                assert!(expression.contains("classList.contains(\"dark\")"));
                assert_eq!(*timeout_ms, Some(5000));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            commands[3],
            Command::Expect {
                selector: "body".to_string(),
                expectation: crate::driver::Expectation::ClassMatches {
                    pattern: r"(^|\s)dark(\s|$)".to_string()
                },
                negate: false,
                timeout_ms: None,
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_theme_propagates_non_convergence() {
        let driver = ScriptedDriver::new();
        driver.fail_on("wait_for_function", || E2eError::Timeout("5000ms".to_string()));
        let err = toggle_theme(&driver, "#toggle", "body", "teal", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("teal"));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_mandatory_field_checks_rejection() {
        let driver = ScriptedDriver::new();
        let form = FormControls {
            submit: "button:has-text(\"Save\")".to_string(),
            error: ".error-message".to_string(),
            success: ".toast-success".to_string(),
        };
        let descriptor = FixtureDescriptor::new("Select Stream", FieldKind::Dropdown).mandatory();

        verify_field(&driver, "form [formControlName=\"SelectStream\"]", &descriptor, &form)
            .await
            .unwrap();

        let labels = driver.labels();
        assert_eq!(
            labels,
            vec![
                "wait:form [formControlName=\"SelectStream\"]",
                "expect:visible:form [formControlName=\"SelectStream\"]",
                "select:form [formControlName=\"SelectStream\"]",
                "click:button:has-text(\"Save\")",
                "expect:visible:.error-message",
                "expect:hidden:.toast-success",
            ]
        );
    }

    #[tokio::test]
    async fn test_optional_field_only_checks_presence() {
        let driver = ScriptedDriver::new();
        let form = FormControls {
            submit: "#save".to_string(),
            error: ".error-message".to_string(),
            success: ".toast-success".to_string(),
        };
        let descriptor = FixtureDescriptor::new("Search", FieldKind::FreeText);
        verify_field(&driver, "#search", &descriptor, &form).await.unwrap();
        assert_eq!(driver.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_read_only_unchanged_value_passes() {
        let driver = ScriptedDriver::new();
        driver.on("input_value:", json!("Admin"));
        verify_read_only(&driver, "#created-by", Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(
            driver.labels(),
            vec![
                "expect:attribute:#created-by",
                "input_value:#created-by",
                "type:#created-by",
                "input_value:#created-by",
                "fill:#created-by",
                "input_value:#created-by",
            ]
        );
    }

    #[tokio::test]
    async fn test_read_only_detects_change() {
        let driver = ScriptedDriver::new();
        driver.on_times("input_value:", 1, json!("Admin"));
        driver.on("input_value:", json!("Adminx"));
        let err = verify_read_only(&driver, "#created-by", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn test_read_only_tolerates_rejected_typing() {
        let driver = ScriptedDriver::new();
        driver.fail_on("type:", || E2eError::Timeout("element is not editable".to_string()));
        driver.on("input_value:", json!("Admin"));
        verify_read_only(&driver, "#created-by", Duration::from_millis(500))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_read_only_detects_programmatic_fill() {
        let driver = ScriptedDriver::new();
        driver.fail_on("type:", || E2eError::Timeout("element is not editable".to_string()));
        // Unchanged after typing, changed after the fill
        driver.on_times("input_value:", 2, json!("Admin"));
        driver.on("input_value:", json!("x"));

        let err = verify_read_only(&driver, "#created-by", Duration::from_millis(500))
            .await
            .unwrap_err();
        match err {
            E2eError::AssertionFailed(msg) => assert!(msg.ends_with("after fill")),
            other => panic!("expected assertion failure, got {:?}", other),
        }

        let bounded = driver.commands().into_iter().any(|c| {
            matches!(c, Command::Fill { timeout_ms: Some(500), .. })
        });
        assert!(bounded);
    }

    #[test]
    fn test_date_picker_format() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_picker_value(date), "07/03/2024");
    }

    #[tokio::test]
    async fn test_fill_field_by_kind() {
        let driver = ScriptedDriver::new();
        fill_field(&driver, "#stream", FieldKind::Dropdown, "1").await.unwrap();
        fill_field(&driver, "#subject", FieldKind::Dropdown, "Math").await.unwrap();
        fill_field(&driver, "#notify", FieldKind::Checkbox, "true").await.unwrap();
        fill_field(&driver, "#date", FieldKind::DatePicker, "07/03/2024").await.unwrap();

        let commands = driver.commands();
        assert_eq!(
            commands[0],
            Command::SelectOption {
                selector: "#stream".to_string(),
                option: SelectBy::Index(1)
            }
        );
        assert_eq!(
            commands[1],
            Command::SelectOption {
                selector: "#subject".to_string(),
                option: SelectBy::Label("Math".to_string())
            }
        );
        assert_eq!(driver.labels()[2], "check:#notify");
        assert_eq!(driver.labels()[3], "fill:#date");
    }
}
