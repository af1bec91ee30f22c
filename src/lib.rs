//! testopia-sync: reconcile JUnit, TestNG and TAP results against a Testopia test run.
//!
//! The library fetches the automated test cases of a Testopia test run, scans a
//! workspace for report files, matches report entries to test cases by alias
//! and pushes the resulting PASSED/FAILED/BLOCKED statuses back to Testopia.
//!
//! # Quick Start
//!
//! ## Using the Builder API
//!
//! ```no_run
//! use testopia_sync::builder;
//!
//! # fn main() -> testopia_sync::Result<()> {
//! let summary = builder().from_config_file("testopia.toml")?.run()?;
//! println!("{} passed, {} failed", summary.report.passed(), summary.report.failed());
//! std::process::exit(summary.outcome.exit_code());
//! # }
//! ```
//!
//! ## Configuration in `testopia.toml`
//!
//! ```toml
//! run-id = 42
//!
//! [[installations]]
//! name = "main"
//! url = "https://bugzilla.example.com/xmlrpc.cgi"
//! username = "ci@example.com"
//! password = "secret"
//!
//! [[seekers]]
//! kind = "junit-class-name"
//! include-pattern = "target/surefire-reports/TEST-*.xml"
//!
//! [[seekers]]
//! kind = "tap-file-name"
//! include-pattern = "t/**/*.tap"
//! ```
//!
//! # Architecture
//!
//! The library is built around three traits:
//!
//! - [`ResultSeeker`](seeker::ResultSeeker): matches one report format and granularity
//!   against the registry view
//! - [`Workspace`](workspace::Workspace): scans and parses report files, locally or
//!   through a remote command
//! - [`TestRegistry`](registry::TestRegistry): the Testopia server (XML-RPC, in-memory
//!   or dry run)
//!
//! # Custom Seeker Example
//!
//! ```no_run
//! use testopia_sync::core::{Result, SeekContext};
//! use testopia_sync::model::RegistryView;
//! use testopia_sync::seeker::ResultSeeker;
//!
//! struct NothingSeeker;
//!
//! impl ResultSeeker for NothingSeeker {
//!     fn seek(&self, _view: &mut RegistryView, _ctx: &mut SeekContext<'_>) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "nothing"
//!     }
//!
//!     fn include_pattern(&self) -> &str {
//!         ""
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `cli` and `xmlrpc`
//! - `cli` - The `testopia-sync` binary
//! - `xmlrpc` - Testopia XML-RPC client over HTTP(S)

pub mod config;
pub mod core;
pub mod model;
pub mod parser;
pub mod registry;
pub mod render;
pub mod report;
pub mod seeker;
pub mod status;
pub mod steps;
pub mod workspace;

// Re-export commonly used types
pub use crate::core::{BuildOutcome, Error, Reconciler, ReconcilerBuilder, Result, RunSummary};
pub use config::{Config, SeekerKind};
pub use report::Report;
pub use status::Status;

/// Create a new reconciler builder.
///
/// This is the main entry point for the fluent API.
pub fn builder() -> ReconcilerBuilder {
    ReconcilerBuilder::new()
}
