//! Registry wrapper that reads through and never writes.

use super::TestRegistry;
use crate::core::error::Result;
use crate::model::{AutomatedTestCase, TestCase, TestRun};
use crate::status::Status;
use tracing::info;

/// Forwards login and queries to `inner` and only logs updates.
pub struct DryRunRegistry<R> {
    inner: R,
}

impl<R: TestRegistry> DryRunRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: TestRegistry> TestRegistry for DryRunRegistry<R> {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.inner.login(username, password)
    }

    fn test_run(&mut self, run_id: i32) -> Result<TestRun> {
        self.inner.test_run(run_id)
    }

    fn test_cases_for_run(&mut self, run_id: i32) -> Result<Vec<TestCase>> {
        self.inner.test_cases_for_run(run_id)
    }

    fn update(&mut self, entry: &AutomatedTestCase) -> Result<()> {
        let status = Status::from_id(entry.status_id()).map_or("Undefined", Status::label);
        info!(
            case_id = entry.id(),
            run_id = entry.run_id(),
            build_id = entry.build_id(),
            env_id = entry.env_id(),
            "dry run: would set status to {status}"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;

    #[test]
    fn test_dry_run_does_not_forward_updates() {
        let run = TestRun {
            id: 4,
            build: "1".to_string(),
            environment: "1".to_string(),
            ..Default::default()
        };
        let inner = InMemoryRegistry::new(run, Vec::new());
        let mut registry = DryRunRegistry::new(inner.clone());

        registry.login("ci", "x").unwrap();
        assert_eq!(registry.test_run(4).unwrap().id, 4);

        let mut entry = AutomatedTestCase::new(TestCase::default(), 4, 1, 1);
        entry.set_status(Status::Failed);
        registry.update(&entry).unwrap();

        assert!(inner.is_logged_in());
        assert!(inner.updates().is_empty());
    }
}
