//! Configuration types and loading from `testopia.toml`.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod env;
mod loader;
pub use loader::ConfigLoader;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "testopia.toml";

/// Complete configuration for a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Name of the installation to use.
    #[serde(default)]
    pub installation: Option<String>,

    /// Testopia test run to reconcile against.
    #[serde(default, rename = "run-id")]
    pub run_id: Option<i32>,

    /// Workspace root, relative to the configuration file's directory.
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    /// Enable debug logging.
    #[serde(default)]
    pub verbose: bool,

    /// Known Testopia installations.
    #[serde(default)]
    pub installations: Vec<Installation>,

    /// Result seekers, run in order.
    #[serde(default)]
    pub seekers: Vec<SeekerConfig>,

    /// Collect reports through a remote command instead of in-process.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    /// Summary output and history.
    #[serde(default)]
    pub report: ReportConfig,

    /// Build steps.
    #[serde(default)]
    pub steps: StepsConfig,
}

impl Config {
    /// The installation selected by name, or the only one defined.
    pub fn selected_installation(&self) -> Result<&Installation> {
        match &self.installation {
            Some(name) => self
                .installations
                .iter()
                .find(|i| &i.name == name)
                .ok_or_else(|| Error::installation(format!("no installation named '{name}'"))),
            None => match self.installations.as_slice() {
                [only] => Ok(only),
                [] => Err(Error::installation("no installation configured")),
                _ => Err(Error::installation(
                    "several installations configured but none selected",
                )),
            },
        }
    }

    /// Mutable variant of [`Config::selected_installation`].
    pub fn selected_installation_mut(&mut self) -> Option<&mut Installation> {
        match self.installation.clone() {
            Some(name) => self.installations.iter_mut().find(|i| i.name == name),
            None if self.installations.len() == 1 => self.installations.first_mut(),
            None => None,
        }
    }

    pub fn require_run_id(&self) -> Result<i32> {
        self.run_id
            .ok_or_else(|| Error::MissingConfig("run-id".to_string()))
    }

    /// Workspace root resolved against `base_dir`.
    pub fn workspace_root(&self, base_dir: &Path) -> PathBuf {
        match &self.workspace {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base_dir.join(path),
            None => base_dir.to_path_buf(),
        }
    }

    /// History directory resolved against the workspace root.
    pub fn history_dir(&self, workspace_root: &Path) -> PathBuf {
        if self.report.history_dir.is_absolute() {
            self.report.history_dir.clone()
        } else {
            workspace_root.join(&self.report.history_dir)
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(remote) = &self.remote {
            if remote.command.is_empty() {
                return Err(Error::InvalidConfig {
                    field: "remote.command".to_string(),
                    value: "[]".to_string(),
                });
            }
        }
        if let Some(run_id) = self.run_id {
            if run_id <= 0 {
                return Err(Error::InvalidConfig {
                    field: "run-id".to_string(),
                    value: run_id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A Testopia server and its credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Installation {
    pub name: String,

    /// XML-RPC endpoint, usually `.../xmlrpc.cgi`.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Free-form properties carried along for compatibility.
    #[serde(default)]
    pub properties: String,
}

/// One configured result seeker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeekerConfig {
    /// Seeker type tag.
    pub kind: SeekerKind,

    /// Ant-style include pattern, relative to the workspace.
    #[serde(rename = "include-pattern")]
    pub include_pattern: String,

    /// Map skipped TestNG methods to blocked instead of not run.
    #[serde(default, rename = "mark-skipped-as-blocked")]
    pub mark_skipped_as_blocked: bool,

    /// Keep the raw report next to every case it updated.
    #[serde(default, rename = "attach-raw")]
    pub attach_raw: bool,
}

impl SeekerConfig {
    pub fn new(kind: SeekerKind, include_pattern: impl Into<String>) -> Self {
        Self {
            kind,
            include_pattern: include_pattern.into(),
            mark_skipped_as_blocked: false,
            attach_raw: false,
        }
    }
}

/// Seeker type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeekerKind {
    /// JUnit, alias = test case class name.
    JunitClassName,
    /// JUnit, alias = bare test method name.
    JunitMethodName,
    /// JUnit, alias = `Class#method`.
    JunitQualifiedMethodName,
    /// JUnit, alias = suite name.
    JunitSuiteName,
    /// TestNG, alias = `Class#method`.
    TestngMethodName,
    /// TestNG, alias = suite name.
    TestngSuiteName,
    /// TAP, alias = file name without extension.
    TapFileName,
}

impl SeekerKind {
    /// The configuration tag.
    pub fn tag(self) -> String {
        serde_plain::to_string(&self).unwrap_or_default()
    }
}

/// Remote workspace command.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RemoteConfig {
    /// Program and arguments; must end up running `testopia-sync collect`.
    pub command: Vec<String>,
}

/// Summary output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Where the previous report and raw attachments are kept.
    #[serde(default = "default_history_dir", rename = "history-dir")]
    pub history_dir: PathBuf,

    #[serde(default)]
    pub format: SummaryFormat,

    #[serde(default)]
    pub color: ColorChoice,
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".testopia")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            history_dir: default_history_dir(),
            format: SummaryFormat::default(),
            color: ColorChoice::default(),
        }
    }
}

/// Summary rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Text,
    Html,
}

/// When to color text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_colorize(self, is_terminal: bool) -> bool {
        match self {
            ColorChoice::Auto => is_terminal,
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Shell command lines run around result seeking.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StepsConfig {
    /// Run once.
    #[serde(default)]
    pub single: Vec<String>,

    /// Run once before iterating.
    #[serde(default)]
    pub before: Vec<String>,

    /// Run once per automated test case with its variables exported.
    #[serde(default)]
    pub iterative: Vec<String>,

    /// Run once after iterating.
    #[serde(default)]
    pub after: Vec<String>,
}

impl StepsConfig {
    pub fn is_empty(&self) -> bool {
        self.single.is_empty()
            && self.before.is_empty()
            && self.iterative.is_empty()
            && self.after.is_empty()
    }
}
