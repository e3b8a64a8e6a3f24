//! Suite definitions, one module per screen

use std::path::Path;

use okiedokie_harness::{E2eError, E2eResult, FixtureCatalog, Suite};

pub mod homework_manager;
pub mod homework_new;
pub mod login;

/// Catalog driving the homework entry screen
pub const HOMEWORK_NEW_CATALOG: &str = "homework_new.yaml";

/// Every suite, in the order they are reported
pub fn all_suites(fixtures_dir: &Path) -> E2eResult<Vec<Suite>> {
    let catalogs = FixtureCatalog::load_all(fixtures_dir)?;
    let catalog = catalogs
        .iter()
        .find(|c| {
            Path::new(&c.source)
                .file_name()
                .map_or(false, |name| name == HOMEWORK_NEW_CATALOG)
        })
        .ok_or_else(|| {
            E2eError::fixture(
                fixtures_dir.display().to_string(),
                format!("no {} catalog", HOMEWORK_NEW_CATALOG),
            )
        })?;

    let suites = vec![
        login::password_suite()?,
        login::mobile_suite()?,
        homework_new::suite(catalog)?,
        homework_manager::suite()?,
    ];
    for suite in &suites {
        suite.validate()?;
    }
    Ok(suites)
}
