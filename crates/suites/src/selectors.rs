//! Selector tables, one per screen

use okiedokie_harness::{E2eResult, SelectorRegistry};

/// Username/password sign-in form at `/login`
pub fn login() -> E2eResult<SelectorRegistry> {
    SelectorRegistry::from_pairs([
        ("username", "#username"),
        ("password", "#password"),
        ("submit", r#"button[type="submit"]"#),
        ("dashboard", "text=Dashboard"),
        ("error", ".error-message"),
    ])
}

/// Mobile-number sign-in at `/auth/login`
pub fn mobile_login() -> E2eResult<SelectorRegistry> {
    SelectorRegistry::from_pairs([
        ("mobile", r#"input[placeholder="Mobile"]"#),
        ("password", r#"input[name="password"]"#),
        ("get_otp", r#"button:has-text("Get OTP")"#),
        ("otp_pending", r#"button:has-text("Wait... Get OTP")"#),
        ("password_login", "text=Password Login"),
        ("welcome", "text=Welcome"),
        ("dashboard", "text=Dashboard"),
        ("invalid_mobile", "text=Invalid Mobile Number"),
    ])
}

/// Homework entry form and table at `/schoolDiary/homeworkNew`
pub fn homework_new() -> E2eResult<SelectorRegistry> {
    let mut registry = login()?;
    registry.extend(&SelectorRegistry::from_pairs([
        ("form", r#"form[name="homeworkForm"]"#),
        ("filter", r#"form [formControlName="{control}"]"#),
        ("stream", r#"form [formControlName="SelectStream"]"#),
        ("section_options", r#"form [formControlName="SelectSection"] option"#),
        ("date", r#"form [formControlName="ChooseHomeworkDate"]"#),
        ("table", "table"),
        ("column_header", r#"table thead th:has-text("{column}")"#),
        ("row_input", r#"table tbody tr >> nth=0 >> input[formControlName="{control}"]"#),
        ("row_text_area", r#"table tbody tr >> nth=0 >> textarea[formControlName="{control}"]"#),
        ("row_save", r#"table tbody tr >> nth=0 >> button:has-text("Save")"#),
        ("save", r#"button:has-text("Save")"#),
        ("error_with", r#".error-message:has-text("{text}")"#),
        ("success", ".toast-success"),
        ("uploaded_file", r#".uploaded-file:has-text("{file}")"#),
        ("theme_toggle", r#"button:has-text("Theme Toggle")"#),
    ])?)?;
    Ok(registry)
}

/// Homework manager list, editor and filters at `/homework-manager`
pub fn homework_manager() -> E2eResult<SelectorRegistry> {
    SelectorRegistry::from_pairs([
        ("username", r#"input[name="username"]"#),
        ("password", r#"input[name="password"]"#),
        ("login", "button#login"),
        ("create", "button#create-homework"),
        ("edit", ".homework-item button.edit"),
        ("delete", ".homework-item button.delete"),
        ("confirm", r#"button:has-text("Confirm")"#),
        ("save", "button#save-homework"),
        ("filter", "button#filter-homework"),
        ("modal", ".modal"),
        ("list", ".homework-list"),
        ("item", ".homework-list .homework-item"),
        ("first_item", ".homework-list .homework-item >> nth=0"),
        ("first_item_part", ".homework-list .homework-item >> nth=0 >> .{part}"),
        ("first_item_buttons", ".homework-list .homework-item >> nth=0 >> button"),
        ("edit_item", r#".homework-item:has-text("{title}") button.edit"#),
        ("delete_item", r#".homework-item:has-text("{title}") button.delete"#),
        ("title", r#"input[name="title"]"#),
        ("subject", r#"select[name="subject"]"#),
        ("message", r#"textarea[name="message"]"#),
        ("file", r#"input[type="file"]"#),
        ("notification", r#".notification-checkbox input[type="checkbox"]"#),
        ("search", "input#search-homework"),
        ("apply_filter", "button#apply-filter"),
        ("clear_filter", "button#clear-filter"),
        ("error", ".error-message"),
        ("theme", "button#theme-{theme}"),
        ("labelled_button", "button[aria-label]"),
        ("focused", ":focus"),
        ("live_region", "[aria-live]"),
        ("high_contrast", "body.high-contrast"),
    ])
}
