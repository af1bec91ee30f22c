//! Report parsers for the supported result formats.
//!
//! All parsed structures are serializable so they can travel back from a
//! remote workspace.

pub mod junit;
pub mod tap;
pub mod testng;
pub mod xml;

pub use junit::{JunitCase, JunitStatus, JunitSuite};
pub use tap::{Directive, TapParser, TapSet};
pub use testng::{TestngMethod, TestngSuite};

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format of the report files a seeker consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Junit,
    Testng,
    Tap,
}

/// Structured content of one report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
pub enum ParsedReport {
    Junit(Vec<JunitSuite>),
    Testng(Vec<TestngSuite>),
    Tap(TapSet),
}

/// A successfully parsed report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Workspace-relative, `/`-separated path.
    pub path: String,
    pub report: ParsedReport,
    /// Raw file content, present when attachments were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ParsedFile {
    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A report file that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: String,
    pub message: String,
}

/// Dispatches report content to the parser for its format.
pub struct ReportParser {
    tap: TapParser,
}

impl ReportParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tap: TapParser::new()?,
        })
    }

    /// Parse `content` read from `path`. Every failure is an [`Error::Parse`].
    pub fn parse(&self, format: ReportFormat, path: &Path, content: &str) -> Result<ParsedReport> {
        let parsed = match format {
            ReportFormat::Junit => junit::parse(content).map(ParsedReport::Junit),
            ReportFormat::Testng => testng::parse(content).map(ParsedReport::Testng),
            ReportFormat::Tap => self.tap.parse(path, content).map(ParsedReport::Tap),
        };
        parsed.map_err(|e| match e {
            Error::Parse { .. } => e,
            other => Error::parse(path, other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_format() {
        let parser = ReportParser::new().unwrap();
        let report = parser
            .parse(ReportFormat::Tap, Path::new("a.tap"), "1..1\nok 1\n")
            .unwrap();
        assert!(matches!(report, ParsedReport::Tap(_)));

        let report = parser
            .parse(
                ReportFormat::Junit,
                Path::new("TEST-a.xml"),
                "<testsuite name=\"a\"/>",
            )
            .unwrap();
        assert!(matches!(report, ParsedReport::Junit(ref s) if s.len() == 1));
    }

    #[test]
    fn test_xml_errors_become_parse_errors() {
        let parser = ReportParser::new().unwrap();
        let err = parser
            .parse(ReportFormat::Testng, Path::new("out/testng.xml"), "<nope")
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().starts_with("Failed to parse out/testng.xml"));
    }

    #[test]
    fn test_parsed_file_name() {
        let file = ParsedFile {
            path: "reports/unit/basic.tap".to_string(),
            report: ParsedReport::Tap(TapSet::default()),
            raw: None,
        };
        assert_eq!(file.file_name(), "basic.tap");
    }

    #[test]
    fn test_parsed_report_serializes_tagged() {
        let report = ParsedReport::Tap(TapSet::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["format"], "tap");
        let back: ParsedReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
