//! TestNG `testng-results.xml` reports.

use super::xml::{Element, parse_document};
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Native TestNG status for a failed method.
pub const FAIL: &str = "FAIL";
/// Native TestNG status for a skipped method.
pub const SKIP: &str = "SKIP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestngMethod {
    pub name: String,
    /// Native status text (`PASS`, `FAIL`, `SKIP`), possibly blank.
    pub status: String,
    pub is_config: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestngClass {
    pub name: String,
    pub methods: Vec<TestngMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestngTest {
    pub name: String,
    pub classes: Vec<TestngClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestngSuite {
    pub name: String,
    pub tests: Vec<TestngTest>,
}

impl TestngSuite {
    /// Every method of the suite in document order, paired with its class.
    pub fn methods(&self) -> impl Iterator<Item = (&TestngClass, &TestngMethod)> {
        self.tests
            .iter()
            .flat_map(|test| test.classes.iter())
            .flat_map(|class| class.methods.iter().map(move |method| (class, method)))
    }
}

/// Parse a TestNG results document into its suites.
pub fn parse(content: &str) -> Result<Vec<TestngSuite>> {
    let root = parse_document(content)?;
    match root.name.as_str() {
        "testng-results" => Ok(root.children_named("suite").map(parse_suite).collect()),
        // Single-suite documents written by some reporters.
        "suite" => Ok(vec![parse_suite(&root)]),
        other => Err(Error::malformed_xml(format!(
            "expected <testng-results> root, found <{other}>"
        ))),
    }
}

fn name_of(element: &Element) -> String {
    element.attr("name").unwrap_or_default().to_string()
}

fn parse_suite(element: &Element) -> TestngSuite {
    TestngSuite {
        name: name_of(element),
        tests: element.children_named("test").map(parse_test).collect(),
    }
}

fn parse_test(element: &Element) -> TestngTest {
    TestngTest {
        name: name_of(element),
        classes: element.children_named("class").map(parse_class).collect(),
    }
}

fn parse_class(element: &Element) -> TestngClass {
    TestngClass {
        name: name_of(element),
        methods: element
            .children_named("test-method")
            .map(|method| TestngMethod {
                name: name_of(method),
                status: method.attr("status").unwrap_or_default().to_string(),
                is_config: method.attr("is-config") == Some("true"),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testng-results skipped="1" failed="1" total="3" passed="1">
  <reporter-output/>
  <suite name="Smoke" duration-ms="12">
    <groups/>
    <test name="Login">
      <class name="com.example.LoginTest">
        <test-method status="PASS" is-config="true" name="setUp"/>
        <test-method status="PASS" name="validUser"/>
        <test-method status="FAIL" name="invalidUser">
          <exception class="java.lang.AssertionError"/>
        </test-method>
      </class>
    </test>
    <test name="Logout">
      <class name="com.example.LogoutTest">
        <test-method status="SKIP" name="logout"/>
        <test-method name="unset"/>
      </class>
    </test>
  </suite>
</testng-results>"#;

    #[test]
    fn test_parse_results_hierarchy() {
        let suites = parse(RESULTS).unwrap();
        assert_eq!(suites.len(), 1);
        let suite = &suites[0];
        assert_eq!(suite.name, "Smoke");
        assert_eq!(suite.tests.len(), 2);
        assert_eq!(suite.tests[0].classes[0].name, "com.example.LoginTest");

        let methods: Vec<_> = suite
            .methods()
            .map(|(class, m)| format!("{}#{}={}", class.name, m.name, m.status))
            .collect();
        assert_eq!(
            methods,
            vec![
                "com.example.LoginTest#setUp=PASS",
                "com.example.LoginTest#validUser=PASS",
                "com.example.LoginTest#invalidUser=FAIL",
                "com.example.LogoutTest#logout=SKIP",
                "com.example.LogoutTest#unset=",
            ]
        );
        assert!(suite.tests[0].classes[0].methods[0].is_config);
        assert!(!suite.tests[0].classes[0].methods[1].is_config);
    }

    #[test]
    fn test_junit_document_is_rejected() {
        assert!(parse("<testsuite name=\"x\"/>").is_err());
    }
}
