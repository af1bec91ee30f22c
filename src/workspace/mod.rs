//! Workspace access: scanning for report files and parsing them, either
//! in-process or on the host that owns the workspace.

pub mod local;
pub mod remote;
mod scan;

pub use local::LocalWorkspace;
pub use remote::{RemoteWorkspace, serve};
pub use scan::{DEFAULT_EXCLUDES, scan, scan_excluding};

use crate::core::error::Result;
use crate::parser::{ParseFailure, ParsedFile, ReportFormat};
use serde::{Deserialize, Serialize};

/// What a seeker asks the workspace for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectRequest {
    pub include_pattern: String,
    pub format: ReportFormat,
    /// Return raw file content alongside the parsed structures.
    #[serde(default)]
    pub include_raw: bool,
    /// Ant-style patterns skipped in addition to the default excludes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

/// Parsed files plus the per-file failures met along the way.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectResponse {
    pub files: Vec<ParsedFile>,
    #[serde(default)]
    pub failures: Vec<ParseFailure>,
}

/// A place report files can be collected from.
///
/// `collect` is a blocking round trip. An `Err` means the scan itself failed;
/// individual unparseable files are reported in [`CollectResponse::failures`].
pub trait Workspace {
    fn collect(&self, request: &CollectRequest) -> Result<CollectResponse>;

    /// Get a human-readable name for this workspace.
    fn name(&self) -> &str;
}
