//! Okie Dokie E2E suites
//!
//! Screens covered:
//! - sign-in (`/login`, `/auth/login`)
//! - homework entry (`/schoolDiary/homeworkNew`), driven by a fixture catalog
//! - homework manager (`/homework-manager`) including its HTTP API
//!
//! The `e2e` test target wires these suites to a Playwright session factory.

pub mod api;
pub mod files;
pub mod login;
pub mod selectors;
pub mod suites;

pub use suites::all_suites;
