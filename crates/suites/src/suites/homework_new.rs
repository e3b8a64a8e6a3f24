//! Homework entry screen at `/schoolDiary/homeworkNew`
//!
//! Filter and column checks are generated from the screen's fixture catalog;
//! the rest are fixed scenarios for the create path and its validation.

use std::sync::Arc;

use tracing::info;

use okiedokie_harness::config::Viewport;
use okiedokie_harness::fixtures::{Category, FieldKind, FixtureDescriptor};
use okiedokie_harness::helpers::{
    fill_field, resize_viewport, today_for_date_picker, toggle_theme, upload_files, verify_field, verify_read_only,
    FormControls,
};
use okiedokie_harness::session::login;
use okiedokie_harness::{E2eError, E2eResult, FixtureCatalog, ScenarioContext, ScenarioParams, Suite};

use crate::files::{UploadFiles, OVERSIZE_BYTES, SMALL_BYTES};
use crate::login::password_flow;
use crate::selectors;

pub const PATH: &str = "/schoolDiary/homeworkNew";

/// Named screen sizes for the layout checks
const VIEWPORTS: [(&str, Viewport); 3] = [
    ("mobile", Viewport::new(375, 800)),
    ("tablet", Viewport::new(768, 1024)),
    ("desktop", Viewport::new(1280, 900)),
];

pub fn suite(catalog: &FixtureCatalog) -> E2eResult<Suite> {
    let mut suite = Suite::new("homework-new", selectors::homework_new()?);
    suite.before_each(|ctx| Box::pin(open_homework_form(ctx)));

    suite.expand(
        catalog.scenario_params(Category::Filter, |d| format!("filter present and validated: {}", d.name)),
        |ctx| Box::pin(filter_present_and_validated(ctx)),
    );

    suite.scenario("stream selection fills section options", |ctx| {
        Box::pin(stream_section_dependency(ctx))
    });

    suite.expand(
        catalog.scenario_params(Category::TableColumn, |d| format!("column visible: {}", d.name)),
        |ctx| Box::pin(column_visible(ctx)),
    );
    suite.expand(
        catalog.scenario_params_where(
            Category::TableColumn,
            |d| d.read_only,
            |d| format!("column read-only: {}", d.name),
        ),
        |ctx| Box::pin(column_read_only(ctx)),
    );

    let filters = Arc::new(catalog.filters.clone());
    suite
        .scenario("create homework with all fields filled", move |ctx| {
            Box::pin(create_homework(ctx, filters.clone()))
        })
        .tag("smoke");

    suite.scenario("empty mandatory fields are rejected", |ctx| {
        Box::pin(empty_mandatory_fields(ctx))
    });
    suite.scenario("invalid URL is rejected", |ctx| Box::pin(invalid_url(ctx)));
    suite.scenario("oversized upload is rejected", |ctx| Box::pin(oversized_upload(ctx)));
    suite.scenario("past date is rejected", |ctx| Box::pin(past_date(ctx)));

    suite.expand(
        VIEWPORTS
            .iter()
            .map(|(name, vp)| {
                ScenarioParams::new(format!("responsive layout: {}", name))
                    .with_value("width", vp.width.to_string())
                    .with_value("height", vp.height.to_string())
            })
            .collect(),
        |ctx| Box::pin(responsive_layout(ctx)),
    );

    Ok(suite)
}

async fn open_homework_form(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let flow = password_flow(ctx.selectors())?;
    let page = ctx.page()?;

    login(page, &flow, ctx.config().credentials()?).await?;
    page.goto(PATH).await?;
    page.wait_visible(&ctx.sel("form")?, None).await
}

fn form_controls(ctx: &ScenarioContext) -> E2eResult<FormControls> {
    Ok(FormControls {
        submit: ctx.sel("save")?,
        error: ctx.sel("error")?,
        success: ctx.sel("success")?,
    })
}

fn filter_selector(ctx: &ScenarioContext, descriptor: &FixtureDescriptor) -> E2eResult<String> {
    ctx.sel_with("filter", &[("control", &descriptor.control_name())])
}

async fn filter_present_and_validated(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let descriptor = ctx.fixture()?;
    let selector = filter_selector(ctx, descriptor)?;
    verify_field(ctx.page()?, &selector, descriptor, &form_controls(ctx)?).await
}

async fn stream_section_dependency(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    fill_field(page, &ctx.sel("stream")?, FieldKind::Dropdown, "1").await?;
    // Placeholder plus at least one real section
    page.expect_count_at_least(&ctx.sel("section_options")?, 2)
        .await
        .map(|_| ())
}

/// Header check, plus empty-value rejection of the row field for mandatory columns
async fn column_visible(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let descriptor = ctx.fixture()?;
    let header = ctx.sel_with("column_header", &[("column", &descriptor.name)])?;
    let page = ctx.page()?;
    page.wait_visible(&header, None).await?;
    page.expect_visible(&header).await?;

    if !descriptor.mandatory {
        return Ok(());
    }
    let field = column_field(ctx, descriptor)?;
    verify_field(page, &field, descriptor, &form_controls(ctx)?).await
}

fn column_field(ctx: &ScenarioContext, descriptor: &FixtureDescriptor) -> E2eResult<String> {
    let template = match descriptor.kind {
        FieldKind::TextArea => "row_text_area",
        _ => "row_input",
    };
    ctx.sel_with(template, &[("control", &descriptor.control_name())])
}

async fn column_read_only(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let input = ctx.sel_with("row_input", &[("control", &ctx.fixture()?.control_name())])?;
    verify_read_only(ctx.page()?, &input, ctx.config().timeouts.action() / 5).await
}

fn row_input(ctx: &ScenarioContext, control: &str) -> E2eResult<String> {
    ctx.sel_with("row_input", &[("control", control)])
}

async fn create_homework(ctx: &mut ScenarioContext, filters: Arc<Vec<FixtureDescriptor>>) -> E2eResult<()> {
    let page = ctx.page()?;
    let today = today_for_date_picker();

    for filter in filters.iter() {
        let selector = filter_selector(ctx, filter)?;
        match filter.kind {
            FieldKind::Dropdown => fill_field(page, &selector, filter.kind, "1").await?,
            FieldKind::DatePicker => fill_field(page, &selector, filter.kind, &today).await?,
            _ => {}
        }
    }

    page.fill(&row_input(ctx, "Title")?, "Test Homework").await?;
    page.fill(
        &ctx.sel_with("row_text_area", &[("control", "Message")])?,
        "Homework message for testing.",
    )
    .await?;
    page.fill(&row_input(ctx, "URL")?, "https://example.com").await?;
    page.fill(&row_input(ctx, "URLDisplayName")?, "Example").await?;

    let files = UploadFiles::new()?;
    let policy = ctx.config().upload_failure_policy;
    for (control, name) in [("File1", "sample.pdf"), ("File2", "sample2.png")] {
        let file = files.write(name, SMALL_BYTES)?;
        let report = upload_files(page, ctx.selectors(), &row_input(ctx, control)?, "uploaded_file", &[file], policy).await?;
        info!("{}: {} uploaded, {} failed", control, report.uploaded.len(), report.failed.len());
    }

    let notification = row_input(ctx, "SendNotification")?;
    page.check(&notification).await?;
    page.expect_checked(&notification).await?;

    let toggle = ctx.sel("theme_toggle")?;
    let bound = ctx.config().timeouts.action();
    toggle_theme(page, &toggle, "body", "dark", bound).await?;
    toggle_theme(page, &toggle, "body", "light", bound).await?;

    page.click(&ctx.sel("row_save")?).await?;
    page.expect_visible(&ctx.sel("success")?).await
}

async fn empty_mandatory_fields(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.fill(&row_input(ctx, "Title")?, "").await?;
    page.fill(&ctx.sel_with("row_text_area", &[("control", "Message")])?, "")
        .await?;
    page.click(&ctx.sel("save")?).await?;
    page.expect_count_at_least(&ctx.sel("error")?, 1).await.map(|_| ())
}

async fn invalid_url(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.fill(&row_input(ctx, "URL")?, "invalid-url").await?;
    page.click(&ctx.sel("save")?).await?;
    page.expect_visible(&ctx.sel_with("error_with", &[("text", "Invalid URL")])?)
        .await
}

async fn oversized_upload(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let files = UploadFiles::new()?;
    let oversize = files.write("oversize.pdf", OVERSIZE_BYTES)?;

    let page = ctx.page()?;
    page.set_input_files(&row_input(ctx, "File1")?, &[oversize], None)
        .await?;
    page.expect_visible(&ctx.sel_with("error_with", &[("text", "File size exceeds limit")])?)
        .await
}

async fn past_date(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.fill(&ctx.sel("date")?, "01/01/2000").await?;
    page.click(&ctx.sel("save")?).await?;
    page.expect_visible(&ctx.sel_with("error_with", &[("text", "Invalid date")])?)
        .await
}

fn dimension(ctx: &ScenarioContext, key: &str) -> E2eResult<u32> {
    ctx.params()
        .value(key)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| E2eError::SuiteDefinition(format!("'{}' needs a numeric {}", ctx.scenario_name(), key)))
}

async fn responsive_layout(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let viewport = Viewport::new(dimension(ctx, "width")?, dimension(ctx, "height")?);
    let page = ctx.page()?;
    resize_viewport(page, viewport, Some(PATH)).await?;
    page.expect_visible(&ctx.sel("table")?).await
}
