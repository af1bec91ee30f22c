//! Regex-based TAP 13 consumer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Error, Result};

/// Directive attached to a test line or plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Skip,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapPlan {
    pub first: u32,
    pub last: u32,
    pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapResult {
    pub ok: bool,
    pub number: Option<u32>,
    pub description: String,
    pub directive: Option<Directive>,
}

/// A parsed TAP stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TapSet {
    pub version: Option<u32>,
    pub plan: Option<TapPlan>,
    pub results: Vec<TapResult>,
    /// Reason of the first `Bail out!` line, if any.
    pub bail_out: Option<String>,
}

impl TapSet {
    pub fn plan_skipped(&self) -> bool {
        self.plan.as_ref().is_some_and(|plan| plan.skip)
    }

    pub fn contains_not_ok(&self) -> bool {
        self.results.iter().any(|r| !r.ok)
    }

    pub fn contains_bail_out(&self) -> bool {
        self.bail_out.is_some()
    }

    pub fn has_directive(&self, directive: Directive) -> bool {
        self.results.iter().any(|r| r.directive == Some(directive))
    }
}

/// Parses TAP text into a [`TapSet`].
pub struct TapParser {
    version_regex: Regex,
    plan_regex: Regex,
    test_regex: Regex,
    directive_regex: Regex,
    bail_regex: Regex,
}

impl TapParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            version_regex: Regex::new(r"^TAP version (\d+)\s*$")?,
            plan_regex: Regex::new(r"^(\d+)\.\.(\d+)\s*(?:#\s*(.*))?$")?,
            test_regex: Regex::new(r"^(not ok|ok)(?:\s+(\d+))?(?:\s+|$)(.*)$")?,
            directive_regex: Regex::new(r"(?i)^(skip|todo)\w*(?:\s|$)")?,
            bail_regex: Regex::new(r"^Bail out!\s*(.*)$")?,
        })
    }

    /// Parse the content of the TAP file at `path`.
    pub fn parse(&self, path: &Path, content: &str) -> Result<TapSet> {
        let mut set = TapSet::default();
        let mut in_yaml = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if in_yaml {
                if trimmed == "..." {
                    in_yaml = false;
                }
                continue;
            }
            if trimmed == "---" && !set.results.is_empty() {
                in_yaml = true;
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(caps) = self.version_regex.captures(trimmed) {
                set.version = caps.get(1).and_then(|m| m.as_str().parse().ok());
            } else if let Some(caps) = self.plan_regex.captures(trimmed) {
                if set.plan.is_some() {
                    return Err(Error::parse(path, "more than one plan"));
                }
                let skip = caps
                    .get(3)
                    .and_then(|m| self.directive(m.as_str()))
                    == Some(Directive::Skip);
                set.plan = Some(TapPlan {
                    first: caps[1].parse().unwrap_or(1),
                    last: caps[2].parse().unwrap_or(0),
                    skip,
                });
            } else if let Some(caps) = self.bail_regex.captures(trimmed) {
                if set.bail_out.is_none() {
                    set.bail_out = Some(caps[1].trim().to_string());
                }
            } else if let Some(caps) = self.test_regex.captures(trimmed) {
                let rest = caps.get(3).map_or("", |m| m.as_str());
                let (description, directive) = match rest.split_once('#') {
                    Some((desc, comment)) => (desc, self.directive(comment)),
                    None => (rest, None),
                };
                let description = description.trim();
                let description = description.strip_prefix('-').unwrap_or(description);
                set.results.push(TapResult {
                    ok: &caps[1] == "ok",
                    number: caps.get(2).and_then(|m| m.as_str().parse().ok()),
                    description: description.trim().to_string(),
                    directive,
                });
            }
        }

        Ok(set)
    }

    fn directive(&self, comment: &str) -> Option<Directive> {
        let caps = self.directive_regex.captures(comment.trim())?;
        if caps[1].eq_ignore_ascii_case("skip") {
            Some(Directive::Skip)
        } else {
            Some(Directive::Todo)
        }
    }
}
