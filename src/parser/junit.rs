//! JUnit XML reports (`<testsuite>` or `<testsuites>` roots).

use super::xml::{Element, parse_document};
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Outcome of a single JUnit test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JunitStatus {
    Passed,
    Failed,
    Skipped,
}

/// A single `<testcase>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunitCase {
    pub name: String,
    pub class_name: String,
    pub status: JunitStatus,
}

impl JunitCase {
    pub fn is_skipped(&self) -> bool {
        self.status == JunitStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == JunitStatus::Failed
    }

    /// `Class#method` key.
    pub fn qualified_name(&self) -> String {
        format!("{}#{}", self.class_name, self.name)
    }
}

/// A `<testsuite>` with its direct test cases. Nested suites are flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunitSuite {
    pub name: String,
    pub cases: Vec<JunitCase>,
}

/// Parse a JUnit report into its flattened list of suites.
pub fn parse(content: &str) -> Result<Vec<JunitSuite>> {
    let root = parse_document(content)?;
    let mut suites = Vec::new();
    match root.name.as_str() {
        "testsuite" => collect_suite(&root, &mut suites),
        "testsuites" => {
            for suite in root.children_named("testsuite") {
                collect_suite(suite, &mut suites);
            }
        }
        other => {
            return Err(Error::malformed_xml(format!(
                "expected <testsuite> or <testsuites> root, found <{other}>"
            )));
        }
    }
    Ok(suites)
}

fn collect_suite(element: &Element, out: &mut Vec<JunitSuite>) {
    let name = element.attr("name").unwrap_or_default().to_string();
    let cases = element
        .children_named("testcase")
        .map(|case| parse_case(case, &name))
        .collect();
    out.push(JunitSuite { name, cases });

    for nested in element.children_named("testsuite") {
        collect_suite(nested, out);
    }
}

fn parse_case(element: &Element, suite_name: &str) -> JunitCase {
    let status = if element.has_child("failure") || element.has_child("error") {
        JunitStatus::Failed
    } else if element.has_child("skipped") {
        JunitStatus::Skipped
    } else {
        JunitStatus::Passed
    };

    let class_name = element
        .attr("classname")
        .or_else(|| element.attr("class"))
        .filter(|c| !c.is_empty())
        .unwrap_or(suite_name)
        .to_string();

    JunitCase {
        name: element.attr("name").unwrap_or_default().to_string(),
        class_name,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUREFIRE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="com.example.FooTest" tests="4" failures="1" errors="1" skipped="1">
  <properties><property name="java.version" value="17"/></properties>
  <testcase name="testAdd" classname="com.example.FooTest" time="0.01"/>
  <testcase name="testSub" classname="com.example.FooTest">
    <failure message="expected 1">stack</failure>
  </testcase>
  <testcase name="testMul" classname="com.example.FooTest">
    <error type="java.lang.NullPointerException"/>
  </testcase>
  <testcase name="testDiv" classname="com.example.FooTest">
    <skipped/>
  </testcase>
  <system-out>noise</system-out>
</testsuite>"#;

    #[test]
    fn test_parse_single_suite() {
        let suites = parse(SUREFIRE).unwrap();
        assert_eq!(suites.len(), 1);
        let suite = &suites[0];
        assert_eq!(suite.name, "com.example.FooTest");
        let statuses: Vec<_> = suite.cases.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                JunitStatus::Passed,
                JunitStatus::Failed,
                JunitStatus::Failed,
                JunitStatus::Skipped
            ]
        );
        assert_eq!(suite.cases[0].qualified_name(), "com.example.FooTest#testAdd");
    }

    #[test]
    fn test_parse_testsuites_flattens_nested() {
        let doc = r#"<testsuites>
  <testsuite name="outer">
    <testcase name="a"/>
    <testsuite name="inner">
      <testcase name="b" classname="pkg.Inner"/>
    </testsuite>
  </testsuite>
  <testsuite name="second"/>
</testsuites>"#;
        let suites = parse(doc).unwrap();
        let names: Vec<_> = suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner", "second"]);
        assert_eq!(suites[0].cases[0].class_name, "outer");
        assert_eq!(suites[1].cases[0].class_name, "pkg.Inner");
        assert!(suites[2].cases.is_empty());
    }

    #[test]
    fn test_wrong_root_is_error() {
        let err = parse("<html><body/></html>").unwrap_err();
        assert!(err.to_string().contains("found <html>"));
    }

    #[test]
    fn test_truncated_report_is_error() {
        assert!(parse("<testsuite name=\"x\"><testcase name=\"a\">").is_err());
    }
}
