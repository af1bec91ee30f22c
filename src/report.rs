//! Per-build report accumulator and its on-disk history.

use crate::core::error::Result;
use crate::model::{AutomatedTestCase, Tally};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the persisted previous report inside the history directory.
pub const LAST_REPORT_FILE: &str = "last-report.json";

/// Counters plus the ordered log of every case updated during a build.
///
/// The counters and the detail log are independent: counters are set from the
/// final tally, while every successful update appends to the log, duplicates
/// included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    passed: usize,
    failed: usize,
    blocked: usize,
    not_run: usize,
    test_cases: Vec<AutomatedTestCase>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an updated case to the detail log. No deduplication.
    pub fn add_test_case(&mut self, entry: AutomatedTestCase) {
        self.test_cases.push(entry);
    }

    pub fn test_cases(&self) -> &[AutomatedTestCase] {
        &self.test_cases
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn blocked(&self) -> usize {
        self.blocked
    }

    pub fn not_run(&self) -> usize {
        self.not_run
    }

    pub fn set_passed(&mut self, passed: usize) {
        self.passed = passed;
    }

    pub fn set_failed(&mut self, failed: usize) {
        self.failed = failed;
    }

    pub fn set_blocked(&mut self, blocked: usize) {
        self.blocked = blocked;
    }

    pub fn set_not_run(&mut self, not_run: usize) {
        self.not_run = not_run;
    }

    /// Overwrite all four counters from a final tally.
    pub fn set_counts(&mut self, tally: Tally) {
        self.passed = tally.passed;
        self.failed = tally.failed;
        self.blocked = tally.blocked;
        self.not_run = tally.not_run;
    }

    /// Sum of the four counters, independent of the detail log length.
    pub fn tests_total(&self) -> usize {
        self.passed + self.failed + self.blocked + self.not_run
    }

    /// Build id of the first logged case, or 0 for an empty report.
    pub fn build_id(&self) -> i32 {
        self.test_cases.first().map_or(0, AutomatedTestCase::build_id)
    }

    /// Run id of the first logged case, or 0 for an empty report.
    pub fn run_id(&self) -> i32 {
        self.test_cases.first().map_or(0, AutomatedTestCase::run_id)
    }

    /// Environment id of the first logged case, or 0 for an empty report.
    pub fn env_id(&self) -> i32 {
        self.test_cases.first().map_or(0, AutomatedTestCase::env_id)
    }
}

/// Report persistence under the configured history directory.
#[derive(Debug, Clone)]
pub struct ReportHistory {
    dir: PathBuf,
    /// Pattern hiding `dir` from workspace scans when it lives inside one.
    scan_exclude: Option<String>,
}

impl ReportHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scan_exclude: None,
        }
    }

    /// Keep scans of `workspace_root` out of the history directory, so saved
    /// attachments are never collected as fresh reports.
    pub fn within_workspace(mut self, workspace_root: &Path) -> Self {
        self.scan_exclude = self
            .dir
            .strip_prefix(workspace_root)
            .ok()
            .map(|relative| {
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .filter(|relative| !relative.is_empty())
            .map(|relative| format!("{relative}/**"));
        self
    }

    /// Workspace-relative exclude pattern for the history directory, if any.
    pub fn scan_exclude(&self) -> Option<&str> {
        self.scan_exclude.as_deref()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn last_report_path(&self) -> PathBuf {
        self.dir.join(LAST_REPORT_FILE)
    }

    /// Load the report saved by the previous build.
    ///
    /// A missing file yields `None`. A file that cannot be read or decoded is
    /// logged and also yields `None`.
    pub fn load_previous(&self) -> Option<Report> {
        let path = self.last_report_path();
        if !path.exists() {
            debug!(path = %path.display(), "no previous report");
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), "cannot read previous report: {e}");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(path = %path.display(), "ignoring corrupt previous report: {e}");
                None
            }
        }
    }

    /// Persist `report` as the previous report for the next build.
    pub fn save(&self, report: &Report) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(self.last_report_path(), json)?;
        Ok(())
    }

    /// Directory that holds raw report attachments for one updated case.
    pub fn artifact_dir(&self, run_id: i32, case_id: i32) -> PathBuf {
        self.dir
            .join("artifacts")
            .join(run_id.to_string())
            .join(case_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestCase;
    use crate::status::Status;

    fn entry(id: i32, status: Status) -> AutomatedTestCase {
        let case = TestCase {
            id,
            automated: true,
            ..Default::default()
        };
        let mut entry = AutomatedTestCase::new(case, 5, 12, 3);
        entry.set_status(status);
        entry
    }

    #[test]
    fn test_empty_report_ids_default_to_zero() {
        let report = Report::new();
        assert_eq!(report.build_id(), 0);
        assert_eq!(report.run_id(), 0);
        assert_eq!(report.env_id(), 0);
        assert_eq!(report.tests_total(), 0);
    }

    #[test]
    fn test_ids_come_from_first_entry() {
        let mut report = Report::new();
        report.add_test_case(entry(1, Status::Passed));
        assert_eq!(report.build_id(), 12);
        assert_eq!(report.run_id(), 5);
        assert_eq!(report.env_id(), 3);
    }

    #[test]
    fn test_total_is_independent_of_detail_log() {
        let mut report = Report::new();
        report.set_passed(3);
        report.set_failed(2);
        report.set_blocked(1);
        report.set_not_run(4);
        report.add_test_case(entry(1, Status::Passed));
        assert_eq!(report.tests_total(), 10);
        assert_eq!(report.test_cases().len(), 1);
    }

    #[test]
    fn test_add_does_not_deduplicate() {
        let mut report = Report::new();
        report.add_test_case(entry(1, Status::Passed));
        report.add_test_case(entry(1, Status::Failed));
        assert_eq!(report.test_cases().len(), 2);
    }

    #[test]
    fn test_history_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let history = ReportHistory::new(dir.path().join("history"));
        assert!(history.load_previous().is_none());

        let mut report = Report::new();
        report.set_passed(1);
        report.add_test_case(entry(9, Status::Passed));
        history.save(&report).unwrap();

        let loaded = history.load_previous().unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_history_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LAST_REPORT_FILE), "{not json").unwrap();
        let history = ReportHistory::new(dir.path());
        assert!(history.load_previous().is_none());
    }

    #[test]
    fn test_artifact_dir_layout() {
        let history = ReportHistory::new("/tmp/h");
        assert_eq!(
            history.artifact_dir(42, 7),
            PathBuf::from("/tmp/h/artifacts/42/7")
        );
    }

    #[test]
    fn test_scan_exclude_inside_workspace() {
        let history = ReportHistory::new("/builds/ws/build/.testopia").within_workspace(Path::new("/builds/ws"));
        assert_eq!(history.scan_exclude(), Some("build/.testopia/**"));

        let outside = ReportHistory::new("/var/lib/testopia").within_workspace(Path::new("/builds/ws"));
        assert_eq!(outside.scan_exclude(), None);

        let root = ReportHistory::new("/builds/ws").within_workspace(Path::new("/builds/ws"));
        assert_eq!(root.scan_exclude(), None);
    }
}
