//! Registry trait and implementations (XML-RPC, in-memory, dry run).

use crate::config::Installation;
use crate::core::error::{Error, Result};
use crate::model::{AutomatedTestCase, TestCase, TestRun};

pub mod dry_run;
pub mod memory;
pub mod xmlrpc;

pub use dry_run::DryRunRegistry;
pub use memory::{InMemoryRegistry, RecordedUpdate};
#[cfg(feature = "xmlrpc")]
pub use xmlrpc::XmlRpcRegistry;

/// Remote test-case registry consumed by the reconciler.
pub trait TestRegistry {
    /// Authenticate. Failures abort the whole run.
    fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// Fetch a test run record.
    fn test_run(&mut self, run_id: i32) -> Result<TestRun>;

    /// Fetch every test case attached to a run, automated or not.
    fn test_cases_for_run(&mut self, run_id: i32) -> Result<Vec<TestCase>>;

    /// Push the entry's current status for its run, build and environment.
    fn update(&mut self, entry: &AutomatedTestCase) -> Result<()>;

    /// Get a human-readable name for this registry.
    fn name(&self) -> &str;
}

impl<R: TestRegistry + ?Sized> TestRegistry for Box<R> {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        (**self).login(username, password)
    }

    fn test_run(&mut self, run_id: i32) -> Result<TestRun> {
        (**self).test_run(run_id)
    }

    fn test_cases_for_run(&mut self, run_id: i32) -> Result<Vec<TestCase>> {
        (**self).test_cases_for_run(run_id)
    }

    fn update(&mut self, entry: &AutomatedTestCase) -> Result<()> {
        (**self).update(entry)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Create the registry client for an installation.
pub fn create_registry_from_config(installation: &Installation) -> Result<Box<dyn TestRegistry>> {
    if installation.url.trim().is_empty() {
        return Err(Error::installation(format!(
            "installation '{}' has no url",
            installation.name
        )));
    }

    xmlrpc_registry(installation.url.trim())
}

#[cfg(feature = "xmlrpc")]
fn xmlrpc_registry(url: &str) -> Result<Box<dyn TestRegistry>> {
    Ok(Box::new(XmlRpcRegistry::new(url)))
}

#[cfg(not(feature = "xmlrpc"))]
fn xmlrpc_registry(_url: &str) -> Result<Box<dyn TestRegistry>> {
    Err(Error::feature_not_enabled("xmlrpc"))
}
