//! Registry records and the per-build view of automated test cases.

use crate::core::error::{Error, Result};
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A test case as stored in the Testopia catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestCase {
    /// Catalog id.
    pub id: i32,
    /// Catalog status (proposed, confirmed, disabled), not the run status.
    pub case_status_id: Option<i32>,
    pub category_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub author_id: Option<i32>,
    pub default_tester_id: Option<i32>,
    pub creation_date: Option<String>,
    pub estimated_time: Option<String>,
    pub automated: bool,
    pub sort_key: Option<String>,
    pub script: Option<String>,
    pub arguments: Option<String>,
    pub summary: Option<String>,
    pub requirement: Option<String>,
    /// Matching key compared against identifiers extracted from reports.
    pub alias: Option<String>,
}

/// A Testopia test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestRun {
    pub id: i32,
    /// Build reference, a decimal build id.
    pub build: String,
    /// Environment reference, a decimal environment id.
    pub environment: String,
    pub manager: Option<String>,
    pub notes: Option<String>,
    pub product_version: Option<String>,
    pub summary: Option<String>,
    pub case_count: Option<i32>,
    pub plan_id: Option<i32>,
    pub plan_text_version: Option<i32>,
    pub status: Option<i32>,
    pub target_completion_date: Option<String>,
    pub target_pass_rate: Option<f64>,
}

impl TestRun {
    /// Build id parsed from the run's build reference.
    pub fn build_id(&self) -> Result<i32> {
        parse_reference(self.id, "build", &self.build)
    }

    /// Environment id parsed from the run's environment reference.
    pub fn environment_id(&self) -> Result<i32> {
        parse_reference(self.id, "environment", &self.environment)
    }
}

fn parse_reference(run_id: i32, what: &str, value: &str) -> Result<i32> {
    value.trim().parse::<i32>().map_err(|_| {
        Error::registry(format!(
            "test run {run_id} has a non-numeric {what} reference '{value}'"
        ))
    })
}

/// An automated test case tracked for one build.
///
/// Run, build and environment ids are fixed when the view is built; only the
/// status changes while seekers run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedTestCase {
    case: TestCase,
    status_id: i32,
    run_id: i32,
    build_id: i32,
    env_id: i32,
}

impl AutomatedTestCase {
    /// Wrap a catalog entry with its run linkage. The status starts as idle.
    pub fn new(case: TestCase, run_id: i32, build_id: i32, env_id: i32) -> Self {
        Self {
            case,
            status_id: Status::Idle.id(),
            run_id,
            build_id,
            env_id,
        }
    }

    pub fn id(&self) -> i32 {
        self.case.id
    }

    pub fn alias(&self) -> Option<&str> {
        self.case.alias.as_deref()
    }

    /// The underlying catalog record.
    pub fn case(&self) -> &TestCase {
        &self.case
    }

    /// Raw run status id; may fall outside the taxonomy for reports loaded from disk.
    pub fn status_id(&self) -> i32 {
        self.status_id
    }

    pub fn status(&self) -> Option<Status> {
        Status::from_id(self.status_id)
    }

    pub fn set_status(&mut self, status: Status) {
        self.status_id = status.id();
    }

    pub fn run_id(&self) -> i32 {
        self.run_id
    }

    pub fn build_id(&self) -> i32 {
        self.build_id
    }

    pub fn env_id(&self) -> i32 {
        self.env_id
    }
}

/// Final per-status counts over a registry view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub not_run: usize,
}

/// The automated test cases of one test run, keyed by catalog id.
///
/// Owned by the orchestrator for the duration of a build; seekers borrow it
/// mutably one at a time.
#[derive(Debug, Clone, Default)]
pub struct RegistryView {
    entries: BTreeMap<i32, AutomatedTestCase>,
}

impl RegistryView {
    /// Build the view from the raw test cases of a run.
    ///
    /// Cases without the automated flag are dropped.
    pub fn from_run(run: &TestRun, cases: Vec<TestCase>) -> Result<Self> {
        let build_id = run.build_id()?;
        let env_id = run.environment_id()?;

        let mut entries = BTreeMap::new();
        for case in cases {
            if !case.automated {
                debug!(case_id = case.id, "skipping manual test case");
                continue;
            }
            let id = case.id;
            let entry = AutomatedTestCase::new(case, run.id, build_id, env_id);
            if entries.insert(id, entry).is_some() {
                warn!(case_id = id, "test case listed twice in run {}", run.id);
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&AutomatedTestCase> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut AutomatedTestCase> {
        self.entries.get_mut(&id)
    }

    /// Iterate entries in catalog id order.
    pub fn iter(&self) -> impl Iterator<Item = &AutomatedTestCase> {
        self.entries.values()
    }

    /// Ids of every entry whose alias equals `key`.
    ///
    /// Aliases are not unique in the catalog, so this can return several ids.
    pub fn ids_with_alias(&self, key: &str) -> Vec<i32> {
        self.entries
            .values()
            .filter(|entry| entry.alias() == Some(key))
            .map(AutomatedTestCase::id)
            .collect()
    }

    /// Count entries by their current status.
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for entry in self.entries.values() {
            match entry.status() {
                Some(Status::Passed) => tally.passed += 1,
                Some(Status::Failed) => tally.failed += 1,
                Some(Status::Blocked) => tally.blocked += 1,
                Some(Status::Idle) | None => tally.not_run += 1,
            }
        }
        tally
    }
}
