//! Homework manager at `/homework-manager`: layout, CRUD through the UI,
//! edge cases, the HTTP API and accessibility

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use okiedokie_harness::config::Viewport;
use okiedokie_harness::driver::{PageDriver, SelectBy};
use okiedokie_harness::helpers::{resize_viewport, toggle_theme};
use okiedokie_harness::selectors::first;
use okiedokie_harness::session::login;
use okiedokie_harness::{E2eError, E2eResult, ScenarioContext, SelectorRegistry, Suite};

use crate::api::{Homework, HomeworkApi};
use crate::files::{UploadFiles, SMALL_BYTES};
use crate::login::{homework_manager_flow, SLOW_SCREEN_TIMEOUT};
use crate::selectors;

pub const PATH: &str = "/homework-manager";

const BREAKPOINTS: [Viewport; 5] = [
    Viewport::new(375, 800),
    Viewport::new(800, 1024),
    Viewport::new(1100, 1200),
    Viewport::new(1366, 768),
    Viewport::new(1920, 1080),
];

const THEMES: [&str; 3] = ["light", "dark", "teal"];

pub fn suite() -> E2eResult<Suite> {
    let mut suite = Suite::new("homework-manager", selectors::homework_manager()?);
    suite
        .with_timeout(Duration::from_secs(180))
        .before_each(|ctx| Box::pin(open_manager(ctx)));

    suite
        .scenario("UI-001: page loads on mobile", |ctx| Box::pin(mobile_layout(ctx)))
        .tag("smoke");
    suite.scenario("UI-002: list stays visible across breakpoints", |ctx| {
        Box::pin(breakpoints(ctx))
    });
    suite.scenario("UI-003: theme switching", |ctx| Box::pin(theme_switching(ctx)));
    suite.scenario("UI-004: list item formatting", |ctx| Box::pin(list_formatting(ctx)));
    suite.scenario("UI-005: filter modal opens", |ctx| Box::pin(filter_modal(ctx)));

    suite
        .scenario("FUNC-001: create homework", |ctx| Box::pin(create_homework(ctx)))
        .tag("smoke");
    suite.scenario("FUNC-002: edit homework", |ctx| Box::pin(edit_homework(ctx)));
    suite.scenario("FUNC-003: delete homework", |ctx| Box::pin(delete_homework(ctx)));
    suite.scenario("FUNC-004: attach a file", |ctx| Box::pin(attach_file(ctx)));
    suite.scenario("FUNC-005: filter and search", |ctx| Box::pin(filter_and_search(ctx)));
    suite.scenario("FUNC-006: notification setting", |ctx| Box::pin(notification_setting(ctx)));

    suite.scenario("EDGE-001: large list", |ctx| Box::pin(large_list(ctx)));
    suite.scenario("EDGE-002: invalid file type is rejected", |ctx| {
        Box::pin(invalid_file_type(ctx))
    });
    suite.scenario("EDGE-003: saving while offline", |ctx| Box::pin(offline_save(ctx)));
    suite.scenario("EDGE-004: concurrent edits from two sessions", |ctx| {
        Box::pin(concurrent_edits(ctx))
    });
    suite.scenario("EDGE-005: special characters", |ctx| Box::pin(special_characters(ctx)));
    suite.scenario("EDGE-006: very long text", |ctx| Box::pin(long_text(ctx)));
    suite.scenario("EDGE-007: rapid interactions", |ctx| Box::pin(rapid_interactions(ctx)));
    suite.scenario("EDGE-008: back and forward navigation", |ctx| {
        Box::pin(back_forward(ctx))
    });

    suite
        .api_scenario("API-001: list homework", |ctx| Box::pin(api_list(ctx)))
        .tag("api");
    suite
        .api_scenario("API-002: create homework", |ctx| Box::pin(api_create(ctx)))
        .tag("api");
    suite
        .api_scenario("API-003: update homework", |ctx| Box::pin(api_update(ctx)))
        .tag("api");
    suite
        .api_scenario("API-004: delete homework", |ctx| Box::pin(api_delete(ctx)))
        .tag("api");
    suite
        .api_scenario("API-005: upload a file", |ctx| Box::pin(api_upload(ctx)))
        .tag("api");
    suite
        .api_scenario("API: non-ASCII title round-trip", |ctx| Box::pin(api_round_trip(ctx)))
        .tag("api");
    suite
        .api_scenario("API: identical create twice", |ctx| Box::pin(api_idempotence(ctx)))
        .tag("api");

    suite.scenario("ACCESS-001: keyboard navigation", |ctx| Box::pin(keyboard_navigation(ctx)));
    suite.scenario("ACCESS-002: buttons carry ARIA labels", |ctx| Box::pin(aria_labels(ctx)));
    suite.scenario("ACCESS-003: first Tab reaches a visible control", |ctx| {
        Box::pin(first_tab_stop(ctx))
    });
    suite.scenario("ACCESS-004: high contrast mode", |ctx| Box::pin(high_contrast(ctx)));
    suite.scenario("ACCESS-005: live region for saved items", |ctx| Box::pin(live_region(ctx)));

    Ok(suite)
}

/// Title with a millisecond stamp, so parallel and repeated runs never collide
fn unique(base: &str) -> String {
    format!("{} {}", base, Utc::now().format("%H%M%S%3f"))
}

async fn signed_in(page: &dyn PageDriver, ctx: &ScenarioContext) -> E2eResult<()> {
    let flow = homework_manager_flow(ctx.selectors())?;
    login(page, &flow, ctx.config().credentials()?).await?;
    page.wait_visible(&ctx.sel("list")?, Some(SLOW_SCREEN_TIMEOUT))
        .await
}

async fn open_manager(ctx: &mut ScenarioContext) -> E2eResult<()> {
    signed_in(ctx.page()?, ctx).await
}

/// Editor input for one homework item
#[derive(Debug, Default)]
struct Draft<'a> {
    title: &'a str,
    subject: Option<&'a str>,
    message: Option<&'a str>,
    files: &'a [PathBuf],
    notify: bool,
}

impl<'a> Draft<'a> {
    fn titled(title: &'a str) -> Self {
        Self {
            title,
            ..Default::default()
        }
    }
}

async fn fill_draft(page: &dyn PageDriver, sel: &SelectorRegistry, draft: &Draft<'_>) -> E2eResult<()> {
    page.click(&sel.require("create", &[])?).await?;
    page.fill(&sel.require("title", &[])?, draft.title).await?;
    if let Some(subject) = draft.subject {
        page.select_option(&sel.require("subject", &[])?, SelectBy::Label(subject.to_string()))
            .await?;
    }
    if let Some(message) = draft.message {
        page.fill(&sel.require("message", &[])?, message).await?;
    }
    if !draft.files.is_empty() {
        page.set_input_files(&sel.require("file", &[])?, draft.files, None)
            .await?;
    }
    if draft.notify {
        page.check(&first(&sel.require("notification", &[])?)).await?;
    }
    Ok(())
}

/// Fill the editor, save and wait for the title to show up in the list
async fn save_draft(page: &dyn PageDriver, sel: &SelectorRegistry, draft: &Draft<'_>) -> E2eResult<()> {
    fill_draft(page, sel, draft).await?;
    page.click(&sel.require("save", &[])?).await?;
    page.expect_contains_text(&sel.require("list", &[])?, draft.title)
        .await
}

async fn mobile_layout(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    resize_viewport(page, BREAKPOINTS[0], None).await?;
    page.expect_visible(&ctx.sel("list")?).await?;
    page.expect_visible(&ctx.sel("create")?).await
}

async fn breakpoints(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let list = ctx.sel("list")?;
    for viewport in BREAKPOINTS {
        resize_viewport(page, viewport, None).await?;
        page.expect_visible(&list).await?;
    }
    Ok(())
}

async fn theme_switching(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let bound = ctx.config().timeouts.action();
    for theme in THEMES {
        let button = ctx.sel_with("theme", &[("theme", theme)])?;
        toggle_theme(page, &button, "body", theme, bound).await?;
    }
    Ok(())
}

async fn list_formatting(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.expect_visible(&ctx.sel("first_item")?).await?;
    for part in ["title", "subject", "message"] {
        page.expect_visible(&ctx.sel_with("first_item_part", &[("part", part)])?)
            .await?;
    }
    page.expect_count_at_most(&ctx.sel("first_item_buttons")?, 3)
        .await
        .map(drop)
}

async fn filter_modal(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.click(&ctx.sel("filter")?).await?;
    page.expect_visible(&ctx.sel("modal")?).await?;
    page.expect_visible(&ctx.sel("apply_filter")?).await?;
    page.expect_visible(&ctx.sel("clear_filter")?).await
}

async fn create_homework(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let files = UploadFiles::new()?;
    let attachment = [files.write("sample.pdf", SMALL_BYTES)?];
    let title = unique("Math Homework");

    let draft = Draft {
        title: &title,
        subject: Some("Math"),
        message: Some("Complete exercises 1-10"),
        files: &attachment,
        notify: true,
    };
    save_draft(ctx.page()?, ctx.selectors(), &draft).await
}

async fn edit_homework(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let original = unique("Edit Me");
    let updated = unique("Updated Homework");

    save_draft(page, ctx.selectors(), &Draft::titled(&original)).await?;
    page.click(&ctx.sel_with("edit_item", &[("title", &original)])?)
        .await?;
    page.fill(&ctx.sel("title")?, &updated).await?;
    page.click(&ctx.sel("save")?).await?;
    page.expect_contains_text(&ctx.sel("list")?, &updated).await
}

async fn delete_homework(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let title = unique("Delete Me");

    save_draft(page, ctx.selectors(), &Draft::titled(&title)).await?;
    page.click(&ctx.sel_with("delete_item", &[("title", &title)])?)
        .await?;
    page.click(&ctx.sel("confirm")?).await?;
    page.expect_not_contains_text(&ctx.sel("list")?, &title).await
}

async fn attach_file(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let files = UploadFiles::new()?;
    let attachment = [files.write("sample.pdf", SMALL_BYTES)?];
    let input = ctx.sel("file")?;
    let page = ctx.page()?;

    page.click(&ctx.sel("create")?).await?;
    page.set_input_files(&input, &attachment, None).await?;
    page.expect_count(&input, 1).await
}

async fn filter_and_search(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.click(&ctx.sel("filter")?).await?;
    page.fill(&ctx.sel("search")?, "Math").await?;
    page.click(&ctx.sel("apply_filter")?).await?;
    page.expect_contains_text(&ctx.sel("list")?, "Math").await?;
    page.click(&ctx.sel("clear_filter")?).await
}

async fn notification_setting(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let title = unique("Notification Homework");
    let draft = Draft {
        notify: true,
        ..Draft::titled(&title)
    };
    save_draft(ctx.page()?, ctx.selectors(), &draft).await
}

async fn large_list(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.goto(&format!("{}?largeData=true", PATH)).await?;
    page.expect_visible(&ctx.sel("list")?).await
}

async fn invalid_file_type(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let files = UploadFiles::new()?;
    let executable = [files.write("invalid.exe", SMALL_BYTES)?];
    let page = ctx.page()?;

    page.click(&ctx.sel("create")?).await?;
    page.set_input_files(&ctx.sel("file")?, &executable, None).await?;
    page.expect_contains_text(&ctx.sel("error")?, "Invalid file type")
        .await
}

async fn offline_save(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    let draft = Draft::titled("Offline Test");

    page.set_offline(true).await?;
    let saved = async {
        fill_draft(page, ctx.selectors(), &draft).await?;
        page.click(&ctx.sel("save")?).await
    }
    .await;
    // Back online even when the offline steps failed
    let restored = page.set_offline(false).await;
    saved?;
    restored?;

    page.expect_visible(&ctx.sel("list")?).await
}

async fn concurrent_edits(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let second = ctx.open_page().await?;
    let titles = [unique("Concurrent Test 1"), unique("Concurrent Test 2")];

    let edits = async {
        signed_in(second.as_ref(), ctx).await?;
        let pages = [ctx.page()?, second.as_ref()];

        for (page, title) in pages.iter().zip(&titles) {
            fill_draft(*page, ctx.selectors(), &Draft::titled(title)).await?;
        }
        let save = ctx.sel("save")?;
        let error = ctx.sel("error")?;
        for page in pages {
            page.click(&save).await?;
            page.expect_hidden(&error).await?;
        }

        // Both saves land, whichever session made them
        let first_page = pages[0];
        first_page.reload().await?;
        let list = ctx.sel("list")?;
        for title in &titles {
            first_page.expect_contains_text(&list, title).await?;
        }
        Ok::<(), E2eError>(())
    }
    .await;

    if let Err(e) = second.close(None).await {
        warn!("Closing second session failed: {}", e);
    }
    if let Err(e) = second.shutdown().await {
        warn!("Shutting down second session failed: {}", e);
    }
    edits
}

async fn special_characters(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let draft = Draft {
        message: Some("Emoji 👍, Symbols #$%^&*"),
        ..Draft::titled("特殊字符 📝")
    };
    save_draft(ctx.page()?, ctx.selectors(), &draft).await
}

async fn long_text(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let title = "A".repeat(200);
    let message = "B".repeat(1000);
    let page = ctx.page()?;

    fill_draft(
        page,
        ctx.selectors(),
        &Draft {
            message: Some(&message),
            ..Draft::titled(&title)
        },
    )
    .await?;
    page.click(&ctx.sel("save")?).await?;
    page.expect_contains_text(&ctx.sel("list")?, &title[..10]).await
}

async fn rapid_interactions(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let title = unique("Rapid Click Test");
    save_draft(ctx.page()?, ctx.selectors(), &Draft::titled(&title)).await
}

async fn back_forward(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    fill_draft(page, ctx.selectors(), &Draft::titled("Nav Test")).await?;
    page.go_back().await?;
    page.go_forward().await?;
    page.expect_contains_text(&ctx.sel("list")?, "Nav Test").await
}

fn created_id(response: &okiedokie_harness::ApiResponse) -> Option<String> {
    response.json::<Homework>().ok()?.id_segment()
}

/// Create through the API and return the new item's id
async fn create_via_api(api: &HomeworkApi<'_>, homework: &Homework) -> E2eResult<String> {
    let response = api.create(homework).await?;
    response.expect_success()?;
    created_id(&response).ok_or_else(|| {
        E2eError::AssertionFailed(format!("create response carried no id: {}", response.body))
    })
}

async fn remove_all(api: &HomeworkApi<'_>, ids: &[String]) {
    for id in ids {
        match api.delete(id).await {
            Ok(response) if response.is_success() => debug!("Removed homework {}", id),
            Ok(response) => warn!("Removing homework {} returned {}", id, response.status),
            Err(e) => warn!("Removing homework {} failed: {}", id, e),
        }
    }
}

async fn api_list(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let items = HomeworkApi::new(ctx.api()).list().await?;
    if items.is_empty() {
        return Err(E2eError::AssertionFailed("homework list is empty".to_string()));
    }
    Ok(())
}

async fn api_create(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let api = HomeworkApi::new(ctx.api());
    let response = api.create(&Homework::new("Physics", "Optics", "Chapter 5")).await?;
    response.expect_success()?;
    if let Some(id) = created_id(&response) {
        remove_all(&api, &[id]).await;
    }
    Ok(())
}

async fn api_update(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let api = HomeworkApi::new(ctx.api());
    let id = create_via_api(&api, &Homework::new("Physics", &unique("Optics"), "Chapter 5")).await?;

    let updated = api
        .update(&id, &serde_json::json!({ "title": "Updated via API" }))
        .await
        .and_then(|r| r.expect_success().map(drop));
    remove_all(&api, &[id]).await;
    updated
}

async fn api_delete(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let api = HomeworkApi::new(ctx.api());
    let id = create_via_api(&api, &Homework::new("Physics", &unique("Optics"), "Chapter 5")).await?;
    api.delete(&id).await?.expect_success().map(drop)
}

async fn api_upload(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let files = UploadFiles::new()?;
    let file = files.write("sample.pdf", SMALL_BYTES)?;
    HomeworkApi::new(ctx.api())
        .upload(&file)
        .await?
        .expect_success()
        .map(drop)
}

async fn api_round_trip(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let api = HomeworkApi::new(ctx.api());
    let title = unique("特殊字符 📝 ✓");

    let response = api.create(&Homework::new("Languages", &title, "Round trip")).await?;
    response.expect_success()?;
    let ids: Vec<String> = created_id(&response).into_iter().collect();

    let listed = api.list().await;
    remove_all(&api, &ids).await;

    if !listed?.iter().any(|h| h.title.as_deref() == Some(title.as_str())) {
        return Err(E2eError::AssertionFailed(format!(
            "'{}' is not listed unchanged",
            title
        )));
    }
    Ok(())
}

async fn api_idempotence(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let api = HomeworkApi::new(ctx.api());
    let title = unique("Idempotence");
    let homework = Homework::new("Physics", &title, "Same payload twice");

    let first = api.create(&homework).await?;
    first.expect_success()?;
    let second = api.create(&homework).await?;
    let ids: Vec<String> = [&first, &second].into_iter().filter_map(created_id).collect();

    let verdict = if second.is_success() {
        api.list().await.and_then(|items| {
            let copies = items.iter().filter(|h| h.title.as_deref() == Some(title.as_str())).count();
            if copies == 2 {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "two identical creates listed {} time(s)",
                    copies
                )))
            }
        })
    } else if (400..500).contains(&second.status) {
        debug!("Server rejected the duplicate with {}", second.status);
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "duplicate create returned {}",
            second.status
        )))
    };

    remove_all(&api, &ids).await;
    verdict
}

async fn keyboard_navigation(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.press(None, "Tab").await?;
    page.press(None, "Tab").await?;
    page.expect_visible(&ctx.sel("focused")?).await
}

async fn aria_labels(ctx: &mut ScenarioContext) -> E2eResult<()> {
    ctx.page()?
        .expect_count_at_least(&ctx.sel("labelled_button")?, 1)
        .await
        .map(drop)
}

async fn first_tab_stop(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.press(None, "Tab").await?;
    page.expect_visible(&ctx.sel("focused")?).await
}

async fn high_contrast(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let page = ctx.page()?;
    page.evaluate("document.body.classList.add('high-contrast')").await?;
    page.expect_visible(&ctx.sel("high_contrast")?).await
}

async fn live_region(ctx: &mut ScenarioContext) -> E2eResult<()> {
    let title = unique("Live Region Test");
    let page = ctx.page()?;
    save_draft(page, ctx.selectors(), &Draft::titled(&title)).await?;
    page.expect_count_at_least(&ctx.sel("live_region")?, 1)
        .await
        .map(drop)
}
