//! Build steps run around result seeking, and the per-case environment
//! exported to them.

use crate::config::StepsConfig;
use crate::core::error::{Error, Result};
use crate::core::outcome::BuildOutcome;
use crate::model::{AutomatedTestCase, RegistryView, TestRun};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Exit status of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub command: String,
    /// Exit code, or -1 when the process was killed by a signal.
    pub exit_code: i32,
    pub success: bool,
}

/// Runs shell command lines in the workspace root.
#[derive(Debug, Clone)]
pub struct StepRunner {
    workspace_root: PathBuf,
}

impl StepRunner {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Run `command` through `sh -c` with `vars` added to the environment.
    pub fn run_step(&self, command: &str, vars: &[(String, String)]) -> Result<StepResult> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.workspace_root)
            .envs(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        debug!(command, "running build step");
        let status = cmd
            .status()
            .map_err(|e| Error::step(format!("failed to execute '{command}': {e}")))?;

        Ok(StepResult {
            command: command.to_string(),
            exit_code: status.code().unwrap_or(-1),
            success: status.success(),
        })
    }

    /// Run every configured step: `single`, then `before`, then `iterative`
    /// once per automated case in id order, then `after`.
    ///
    /// A failing or unspawnable step is logged and makes the build unstable;
    /// the remaining steps still run.
    pub fn run_all(&self, steps: &StepsConfig, view: &RegistryView, run: &TestRun) -> BuildOutcome {
        let mut outcome = BuildOutcome::Success;

        for command in steps.single.iter().chain(&steps.before) {
            self.run_checked(command, &[], &mut outcome);
        }

        if !steps.iterative.is_empty() {
            for entry in view.iter() {
                info!(case_id = entry.id(), "running iterative steps");
                let vars = testcase_env_vars(entry, run);
                for command in &steps.iterative {
                    self.run_checked(command, &vars, &mut outcome);
                }
            }
        }

        for command in &steps.after {
            self.run_checked(command, &[], &mut outcome);
        }

        outcome
    }

    fn run_checked(&self, command: &str, vars: &[(String, String)], outcome: &mut BuildOutcome) {
        match self.run_step(command, vars) {
            Ok(result) if result.success => {}
            Ok(result) => {
                warn!(command, exit_code = result.exit_code, "build step failed");
                *outcome = BuildOutcome::Unstable;
            }
            Err(e) => {
                warn!("{e}");
                *outcome = BuildOutcome::Unstable;
            }
        }
    }
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Environment variables describing one automated case and its run.
///
/// Absent values are exported as the empty string.
pub fn testcase_env_vars(entry: &AutomatedTestCase, run: &TestRun) -> Vec<(String, String)> {
    let case = entry.case();
    let vars = [
        ("TESTOPIA_TESTCASE_ID", entry.id().to_string()),
        ("TESTOPIA_TESTCASE_RUN_ID", entry.run_id().to_string()),
        ("TESTOPIA_TESTCASE_BUILD_ID", entry.build_id().to_string()),
        ("TESTOPIA_TESTCASE_ENV_ID", entry.env_id().to_string()),
        ("TESTOPIA_TESTCASE_SCRIPT", opt(case.script.as_deref())),
        ("TESTOPIA_TESTCASE_ALIAS", opt(case.alias.as_deref())),
        ("TESTOPIA_TESTCASE_ARGUMENTS", opt(case.arguments.as_deref())),
        ("TESTOPIA_TESTCASE_REQUIREMENT", opt(case.requirement.as_deref())),
        ("TESTOPIA_TESTCASE_SORT_KEY", opt(case.sort_key.as_deref())),
        ("TESTOPIA_TESTCASE_SUMMARY", opt(case.summary.as_deref())),
        ("TESTOPIA_TESTCASE_AUTHOR_ID", opt(case.author_id)),
        ("TESTOPIA_TESTCASE_CATEGORY_ID", opt(case.category_id)),
        ("TESTOPIA_TESTCASE_DEFAULT_TESTER_ID", opt(case.default_tester_id)),
        ("TESTOPIA_TESTCASE_PRIORITY_ID", opt(case.priority_id)),
        ("TESTOPIA_TESTCASE_STATUS_ID", opt(case.case_status_id)),
        ("TESTOPIA_TESTCASE_AUTOMATED", case.automated.to_string()),
        ("TESTOPIA_TESTCASE_CREATION_DATE", opt(case.creation_date.as_deref())),
        ("TESTOPIA_TESTCASE_ESTIMATED_TIME", opt(case.estimated_time.as_deref())),
        ("TESTOPIA_TESTRUN_ID", run.id.to_string()),
        ("TESTOPIA_TESTRUN_BUILD", run.build.clone()),
        ("TESTOPIA_TESTRUN_ENVIRONMENT", run.environment.clone()),
        ("TESTOPIA_TESTRUN_MANAGER", opt(run.manager.as_deref())),
        ("TESTOPIA_TESTRUN_NOTES", opt(run.notes.as_deref())),
        ("TESTOPIA_TESTRUN_PRODUCT_VERSION", opt(run.product_version.as_deref())),
        ("TESTOPIA_TESTRUN_SUMMARY", opt(run.summary.as_deref())),
        ("TESTOPIA_TESTRUN_CASE_COUNT", opt(run.case_count)),
        ("TESTOPIA_TESTRUN_PLAN_ID", opt(run.plan_id)),
        ("TESTOPIA_TESTRUN_PLAN_TEXT_VERSION", opt(run.plan_text_version)),
        ("TESTOPIA_TESTRUN_STATUS", opt(run.status)),
        (
            "TESTOPIA_TESTRUN_TARGET_COMPLETION_DATE",
            opt(run.target_completion_date.as_deref()),
        ),
        ("TESTOPIA_TESTRUN_TARGET_PASS_RATE", opt(run.target_pass_rate)),
    ];
    vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
