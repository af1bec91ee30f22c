//! Registry held in process memory.

use super::TestRegistry;
use crate::core::error::{Error, Result};
use crate::model::{AutomatedTestCase, TestCase, TestRun};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// One `update` call as received by [`InMemoryRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub case_id: i32,
    pub run_id: i32,
    pub build_id: i32,
    pub env_id: i32,
    pub status_id: i32,
}

#[derive(Debug, Default)]
struct State {
    run: TestRun,
    cases: Vec<TestCase>,
    credentials: Option<(String, String)>,
    logged_in: bool,
    failing_updates: HashSet<i32>,
    updates: Vec<RecordedUpdate>,
}

/// A registry serving one test run from memory and recording every update.
///
/// Clones share state, so a clone handed to the reconciler can be inspected
/// through the original afterwards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<Mutex<State>>,
}

impl InMemoryRegistry {
    pub fn new(run: TestRun, cases: Vec<TestCase>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                run,
                cases,
                ..Default::default()
            })),
        }
    }

    /// Only accept these credentials on login.
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        self.lock().credentials = Some((username.to_string(), password.to_string()));
        self
    }

    /// Make updates for `case_id` fail.
    pub fn with_failing_update(self, case_id: i32) -> Self {
        self.lock().failing_updates.insert(case_id);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every successful update, in call order.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.lock().updates.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.lock().logged_in
    }
}

impl TestRegistry for InMemoryRegistry {
    fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some((user, pass)) = &state.credentials {
            if user != username || pass != password {
                return Err(Error::login(format!("invalid credentials for {username}")));
            }
        }
        state.logged_in = true;
        Ok(())
    }

    fn test_run(&mut self, run_id: i32) -> Result<TestRun> {
        let state = self.lock();
        if state.run.id != run_id {
            return Err(Error::registry(format!("test run {run_id} does not exist")));
        }
        Ok(state.run.clone())
    }

    fn test_cases_for_run(&mut self, run_id: i32) -> Result<Vec<TestCase>> {
        let state = self.lock();
        if state.run.id != run_id {
            return Err(Error::registry(format!("test run {run_id} does not exist")));
        }
        Ok(state.cases.clone())
    }

    fn update(&mut self, entry: &AutomatedTestCase) -> Result<()> {
        let mut state = self.lock();
        if state.failing_updates.contains(&entry.id()) {
            return Err(Error::registry(format!(
                "update rejected for test case {}",
                entry.id()
            )));
        }
        state.updates.push(RecordedUpdate {
            case_id: entry.id(),
            run_id: entry.run_id(),
            build_id: entry.build_id(),
            env_id: entry.env_id(),
            status_id: entry.status_id(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
