//! Seekers over TestNG `testng-results.xml` reports.

use super::{Attachment, ResultSeeker, apply_status, collect, wrong_format};
use crate::core::context::SeekContext;
use crate::core::error::Result;
use crate::model::RegistryView;
use crate::parser::testng::{FAIL, SKIP};
use crate::parser::{ParsedFile, ParsedReport, ReportFormat, TestngMethod, TestngSuite};
use crate::status::Status;
use tracing::info;

/// Options shared by the TestNG seekers.
#[derive(Debug, Clone)]
struct TestngSource {
    include_pattern: String,
    mark_skipped_as_blocked: bool,
    attach_raw: bool,
}

impl TestngSource {
    fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            include_pattern: include_pattern.into(),
            mark_skipped_as_blocked: false,
            attach_raw: false,
        }
    }

    fn collect(&self, ctx: &mut SeekContext<'_>) -> Result<Vec<ParsedFile>> {
        collect(ctx, ReportFormat::Testng, &self.include_pattern, self.attach_raw)
    }

    fn skipped(&self) -> Status {
        if self.mark_skipped_as_blocked {
            Status::Blocked
        } else {
            Status::Idle
        }
    }

    /// FAIL fails, SKIP is blocked or not run, anything else passes.
    fn method_status(&self, method: &TestngMethod) -> Status {
        match method.status.trim() {
            FAIL => Status::Failed,
            SKIP => self.skipped(),
            _ => Status::Passed,
        }
    }

    /// The first failing or skipped method in document order decides.
    fn suite_status(&self, suite: &TestngSuite) -> Status {
        suite
            .methods()
            .map(|(_, method)| self.method_status(method))
            .find(|status| *status != Status::Passed)
            .unwrap_or(Status::Passed)
    }
}

fn suites<'f>(ctx: &mut SeekContext<'_>, file: &'f ParsedFile) -> Option<&'f [TestngSuite]> {
    match &file.report {
        ParsedReport::Testng(suites) => Some(suites),
        _ => {
            wrong_format(ctx, file, ReportFormat::Testng);
            None
        }
    }
}

/// Matches `Class#method` of each test method.
#[derive(Debug, Clone)]
pub struct TestngMethodNameSeeker {
    source: TestngSource,
}

impl TestngMethodNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: TestngSource::new(include_pattern),
        }
    }

    /// Map skipped methods to blocked instead of not run.
    pub fn mark_skipped_as_blocked(mut self, enabled: bool) -> Self {
        self.source.mark_skipped_as_blocked = enabled;
        self
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

impl ResultSeeker for TestngMethodNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for TestNG test methods");
        let files = self.source.collect(ctx)?;
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            for (class, method) in suites.iter().flat_map(TestngSuite::methods) {
                let key = format!("{}#{}", class.name, method.name);
                let status = self.source.method_status(method);
                apply_status(view, &key, status, ctx, Attachment::of(file));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "testng-method-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

/// Matches suite names.
#[derive(Debug, Clone)]
pub struct TestngSuiteNameSeeker {
    source: TestngSource,
}

impl TestngSuiteNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: TestngSource::new(include_pattern),
        }
    }

    pub fn mark_skipped_as_blocked(mut self, enabled: bool) -> Self {
        self.source.mark_skipped_as_blocked = enabled;
        self
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

impl ResultSeeker for TestngSuiteNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for TestNG test suites");
        let files = self.source.collect(ctx)?;
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            for suite in suites {
                let status = self.source.suite_status(suite);
                apply_status(view, &suite.name, status, ctx, Attachment::of(file));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "testng-suite-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use crate::seeker::test_support::{case, fixture, write};
    use crate::workspace::LocalWorkspace;

    fn results(suite: &str, methods: &[(&str, &str, &str)]) -> String {
        let mut xml = format!(
            "<testng-results skipped=\"0\" failed=\"0\" total=\"{}\" passed=\"0\">\n  <suite name=\"{suite}\">\n    <test name=\"t\">\n",
            methods.len()
        );
        for (class, method, status) in methods {
            xml.push_str(&format!(
                "      <class name=\"{class}\">\n        <test-method status=\"{status}\" signature=\"{method}()\" name=\"{method}\"/>\n      </class>\n"
            ));
        }
        xml.push_str("    </test>\n  </suite>\n</testng-results>\n");
        xml
    }

    fn run_seeker(dir: &std::path::Path, seeker: &dyn ResultSeeker, cases: Vec<crate::model::TestCase>) -> (RegistryView, Vec<i32>) {
        let (mut view, registry) = fixture(cases);
        let mut handle = registry.clone();
        let mut report = Report::new();
        let workspace = LocalWorkspace::new(dir);
        let mut ctx = SeekContext::new(&mut handle, &workspace, &mut report);
        seeker.seek(&mut view, &mut ctx).unwrap();
        let statuses = registry.updates().iter().map(|u| u.status_id).collect();
        (view, statuses)
    }

    #[test]
    fn test_suite_skip_marked_blocked() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "out/testng-results.xml", &results("Smoke", &[("a.B", "m", "SKIP")]));

        let seeker = TestngSuiteNameSeeker::new("**/testng-results.xml").mark_skipped_as_blocked(true);
        let (view, statuses) = run_seeker(dir.path(), &seeker, vec![case(1, "Smoke")]);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Blocked));
        assert_eq!(statuses, vec![Status::Blocked.id()]);
    }

    #[test]
    fn test_suite_skip_not_run_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "testng-results.xml", &results("Smoke", &[("a.B", "m", "SKIP")]));

        let seeker = TestngSuiteNameSeeker::new("testng-results.xml");
        let (view, statuses) = run_seeker(dir.path(), &seeker, vec![case(1, "Smoke")]);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Idle));
        assert!(statuses.is_empty());
    }

    #[test]
    fn test_suite_first_non_passing_method_decides() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "testng-results.xml",
            &results("Smoke", &[("a.B", "one", "PASS"), ("a.B", "two", "FAIL"), ("a.B", "three", "SKIP")]),
        );

        let seeker = TestngSuiteNameSeeker::new("testng-results.xml").mark_skipped_as_blocked(true);
        let (view, _) = run_seeker(dir.path(), &seeker, vec![case(1, "Smoke")]);
        assert_eq!(view.get(1).unwrap().status(), Some(Status::Failed));
    }

    #[test]
    fn test_method_name_statuses() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "testng-results.xml",
            &results(
                "Smoke",
                &[("a.B", "pass", "PASS"), ("a.B", "fail", "FAIL"), ("a.B", "skip", "SKIP"), ("a.B", "blank", "")],
            ),
        );

        let seeker = TestngMethodNameSeeker::new("testng-results.xml").mark_skipped_as_blocked(true);
        let (view, statuses) = run_seeker(
            dir.path(),
            &seeker,
            vec![case(1, "a.B#pass"), case(2, "a.B#fail"), case(3, "a.B#skip"), case(4, "a.B#blank")],
        );

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Passed));
        assert_eq!(view.get(2).unwrap().status(), Some(Status::Failed));
        assert_eq!(view.get(3).unwrap().status(), Some(Status::Blocked));
        assert_eq!(view.get(4).unwrap().status(), Some(Status::Passed));
        assert_eq!(statuses.len(), 4);
    }

    #[test]
    fn test_method_status_mapping() {
        let source = TestngSource::new("*.xml");
        let method = |status: &str| TestngMethod {
            name: "m".to_string(),
            status: status.to_string(),
            is_config: false,
        };
        assert_eq!(source.method_status(&method("FAIL")), Status::Failed);
        assert_eq!(source.method_status(&method("SKIP")), Status::Idle);
        assert_eq!(source.method_status(&method("PASS")), Status::Passed);
        assert_eq!(source.method_status(&method("  ")), Status::Passed);
    }
}
