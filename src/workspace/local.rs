//! In-process workspace collection.

use super::{CollectRequest, CollectResponse, Workspace, scan_excluding};
use crate::core::error::Result;
use crate::parser::{ParseFailure, ParsedFile, ReportParser};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A workspace on the local filesystem.
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Workspace for LocalWorkspace {
    fn collect(&self, request: &CollectRequest) -> Result<CollectResponse> {
        let parser = ReportParser::new()?;
        let mut response = CollectResponse::default();

        for relative in scan_excluding(&self.root, &request.include_pattern, request.excludes.as_slice())? {
            let path = self.root.join(&relative);
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    response.failures.push(ParseFailure {
                        path: relative,
                        message: format!("cannot read file: {e}"),
                    });
                    continue;
                }
            };

            match parser.parse(request.format, Path::new(&relative), &content) {
                Ok(report) => {
                    debug!(path = %relative, "parsed report");
                    response.files.push(ParsedFile {
                        path: relative,
                        report,
                        raw: request.include_raw.then_some(content),
                    });
                }
                Err(e) => response.failures.push(ParseFailure {
                    path: relative,
                    message: e.to_string(),
                }),
            }
        }

        Ok(response)
    }

    fn name(&self) -> &str {
        "local"
    }
}
