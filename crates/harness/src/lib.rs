//! Okie Dokie E2E Harness
//!
//! This crate provides a Rust-controlled browser testing framework that:
//! - Drives Playwright through a long-lived `node` driver process per page
//! - Resolves UI elements through named, parameterized selector tables
//! - Signs in through declarative login flows
//! - Expands declarative fixture catalogs into one scenario per item
//! - Runs scenarios with retries, timeouts and failure diagnostics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── wait_until_reachable(base_url)                       │
//! │    ├── SessionFactory::open() -> Box<dyn PageDriver>        │
//! │    ├── before_each + scenario body (bounded, retried)       │
//! │    └── screenshot / trace / video -> SuiteReport            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Suite                                                      │
//! │    ├── selectors: SelectorRegistry                          │
//! │    ├── before_each: login + navigation                      │
//! │    └── scenarios: [Scenario]                                │
//! │          ├── browser { page, selectors, params }            │
//! │          ├── api { ApiClient }                              │
//! │          └── expanded from FixtureCatalog entries           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixtures;
pub mod helpers;
pub mod playwright;
pub mod probe;
pub mod report;
pub mod runner;
pub mod selectors;
pub mod session;
pub mod suite;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use api::{ApiClient, ApiResponse};
pub use config::SuiteConfig;
pub use driver::{PageDriver, SessionFactory};
pub use error::{E2eError, E2eResult};
pub use fixtures::{FixtureCatalog, FixtureDescriptor, ScenarioParams};
pub use playwright::PlaywrightLauncher;
pub use report::SuiteReport;
pub use runner::{ScenarioFilter, TestRunner};
pub use selectors::SelectorRegistry;
pub use session::{Credentials, LoginFlow};
pub use suite::{ScenarioContext, Suite};
