//! Seekers over JUnit XML reports.

use super::{Attachment, ResultSeeker, apply_status, collect, wrong_format};
use crate::core::context::SeekContext;
use crate::core::error::Result;
use crate::model::RegistryView;
use crate::parser::{JunitCase, JunitSuite, ParsedFile, ParsedReport, ReportFormat};
use crate::status::Status;
use tracing::info;

/// Include pattern and attachment flag shared by the JUnit seekers.
#[derive(Debug, Clone)]
struct JunitSource {
    include_pattern: String,
    attach_raw: bool,
}

impl JunitSource {
    fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            include_pattern: include_pattern.into(),
            attach_raw: false,
        }
    }

    fn collect(&self, ctx: &mut SeekContext<'_>) -> Result<Vec<ParsedFile>> {
        collect(ctx, ReportFormat::Junit, &self.include_pattern, self.attach_raw)
    }
}

/// Suites of a collected file, or `None` after logging a format mismatch.
fn suites<'f>(ctx: &mut SeekContext<'_>, file: &'f ParsedFile) -> Option<&'f [JunitSuite]> {
    match &file.report {
        ParsedReport::Junit(suites) => Some(suites),
        _ => {
            wrong_format(ctx, file, ReportFormat::Junit);
            None
        }
    }
}

/// Passed or failed; callers filter skipped cases out first.
fn case_status(case: &JunitCase) -> Status {
    if case.is_failed() {
        Status::Failed
    } else {
        Status::Passed
    }
}

/// Matches the class name of each case.
///
/// Cases are folded per class across every collected file: the kept result
/// for a class is replaced by a later one unless it already failed, so one
/// failing case fails the whole class.
#[derive(Debug, Clone)]
pub struct JunitClassNameSeeker {
    source: JunitSource,
}

impl JunitClassNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: JunitSource::new(include_pattern),
        }
    }

    /// Keep the report next to every case it updated.
    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

impl ResultSeeker for JunitClassNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for JUnit test classes");
        let files = self.source.collect(ctx)?;

        let mut folded: Vec<(&str, Status, &ParsedFile)> = Vec::new();
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            let cases = suites
                .iter()
                .flat_map(|suite| suite.cases.iter())
                .filter(|case| !case.is_skipped());
            for case in cases {
                let result = (case.class_name.as_str(), case_status(case), file);
                match folded.iter().position(|(class, _, _)| *class == case.class_name) {
                    Some(index) if folded[index].1 == Status::Failed => {}
                    Some(index) => {
                        folded.remove(index);
                        folded.push(result);
                    }
                    None => folded.push(result),
                }
            }
        }

        for (class, status, file) in folded {
            apply_status(view, class, status, ctx, Attachment::of(file));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "junit-class-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

/// Matches the bare method name of each case.
///
/// Methods sharing a name across classes all update the same alias.
#[derive(Debug, Clone)]
pub struct JunitMethodNameSeeker {
    source: JunitSource,
}

impl JunitMethodNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: JunitSource::new(include_pattern),
        }
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

impl ResultSeeker for JunitMethodNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for JUnit test cases");
        let files = self.source.collect(ctx)?;
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            for suite in suites {
                for case in suite.cases.iter().filter(|case| !case.is_skipped()) {
                    apply_status(view, &case.name, case_status(case), ctx, Attachment::of(file));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "junit-method-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

/// Matches `Class#method` of each case.
#[derive(Debug, Clone)]
pub struct JunitQualifiedMethodNameSeeker {
    source: JunitSource,
}

impl JunitQualifiedMethodNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: JunitSource::new(include_pattern),
        }
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

impl ResultSeeker for JunitQualifiedMethodNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for JUnit test methods");
        let files = self.source.collect(ctx)?;
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            for suite in suites {
                for case in suite.cases.iter().filter(|case| !case.is_skipped()) {
                    let key = case.qualified_name();
                    apply_status(view, &key, case_status(case), ctx, Attachment::of(file));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "junit-qualified-method-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

/// Matches suite names. A suite fails if any of its non-skipped cases failed.
#[derive(Debug, Clone)]
pub struct JunitSuiteNameSeeker {
    source: JunitSource,
}

impl JunitSuiteNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            source: JunitSource::new(include_pattern),
        }
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.source.attach_raw = attach_raw;
        self
    }
}

/// Skipped cases never fail a suite.
fn suite_status(suite: &JunitSuite) -> Status {
    if suite.cases.iter().any(JunitCase::is_failed) {
        Status::Failed
    } else {
        Status::Passed
    }
}

impl ResultSeeker for JunitSuiteNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for JUnit test suites");
        let files = self.source.collect(ctx)?;
        for file in &files {
            let Some(suites) = suites(ctx, file) else {
                continue;
            };
            for suite in suites {
                apply_status(view, &suite.name, suite_status(suite), ctx, Attachment::of(file));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "junit-suite-name"
    }

    fn include_pattern(&self) -> &str {
        &self.source.include_pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::BuildOutcome;
    use crate::report::{Report, ReportHistory};
    use crate::seeker::test_support::{case, fixture, write};
    use crate::workspace::LocalWorkspace;

    const FOO_PASS: &str = r#"<testsuite name="com.example.FooTest" tests="1">
  <testcase classname="com.example.FooTest" name="testAdd" time="0.01"/>
</testsuite>"#;

    fn suite(name: &str, cases: &[(&str, &str, &str)]) -> String {
        let mut xml = format!("<testsuite name=\"{name}\">\n");
        for (class, method, outcome) in cases {
            let body = match *outcome {
                "fail" => "<failure message=\"boom\"/>",
                "error" => "<error type=\"java.lang.NullPointerException\"/>",
                "skip" => "<skipped/>",
                _ => "",
            };
            xml.push_str(&format!(
                "  <testcase classname=\"{class}\" name=\"{method}\">{body}</testcase>\n"
            ));
        }
        xml.push_str("</testsuite>\n");
        xml
    }

    /// Run `seeker` over a workspace and return the final status of `case_id`.
    fn seek_in(
        dir: &std::path::Path,
        seeker: &dyn ResultSeeker,
        view: &mut RegistryView,
        registry: &mut crate::registry::InMemoryRegistry,
        report: &mut Report,
    ) -> BuildOutcome {
        let workspace = LocalWorkspace::new(dir);
        let mut ctx = SeekContext::new(registry, &workspace, report);
        seeker.seek(view, &mut ctx).unwrap();
        ctx.outcome()
    }

    #[test]
    fn test_class_name_single_passing_case() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "target/surefire-reports/TEST-Foo.xml", FOO_PASS);

        let (mut view, registry) = fixture(vec![case(1, "com.example.FooTest")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        let seeker = JunitClassNameSeeker::new("target/surefire-reports/TEST-*.xml");
        let outcome = seek_in(dir.path(), &seeker, &mut view, &mut handle, &mut report);

        assert_eq!(outcome, BuildOutcome::Success);
        assert_eq!(view.get(1).unwrap().status(), Some(Status::Passed));
        let updates = registry.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status_id, Status::Passed.id());
        assert_eq!((updates[0].run_id, updates[0].build_id, updates[0].env_id), (10, 20, 30));
        assert_eq!(report.test_cases().len(), 1);
    }

    #[test]
    fn test_class_name_failure_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "TEST-C.xml",
            &suite("s", &[("C", "first", "fail"), ("C", "second", "pass")]),
        );

        let (mut view, registry) = fixture(vec![case(1, "C")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitClassNameSeeker::new("*.xml"), &mut view, &mut handle, &mut report);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Failed));
        assert_eq!(registry.updates().len(), 1);
    }

    #[test]
    fn test_class_name_later_failure_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "TEST-C.xml",
            &suite("s", &[("C", "first", "pass"), ("C", "second", "error")]),
        );

        let (mut view, registry) = fixture(vec![case(1, "C")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitClassNameSeeker::new("*.xml"), &mut view, &mut handle, &mut report);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Failed));
        assert_eq!(registry.updates()[0].status_id, Status::Failed.id());
    }

    #[test]
    fn test_class_name_folds_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "TEST-a.xml", &suite("a", &[("C", "one", "fail")]));
        write(dir.path(), "TEST-b.xml", &suite("b", &[("C", "two", "pass")]));

        let (mut view, registry) = fixture(vec![case(1, "C")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitClassNameSeeker::new("*.xml"), &mut view, &mut handle, &mut report);

        let updates = registry.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status_id, Status::Failed.id());
    }

    #[test]
    fn test_class_name_ignores_skipped_cases() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "TEST-C.xml",
            &suite("s", &[("C", "a", "pass"), ("C", "b", "skip"), ("D", "c", "skip")]),
        );

        let (mut view, registry) = fixture(vec![case(1, "C"), case(2, "D")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitClassNameSeeker::new("*.xml"), &mut view, &mut handle, &mut report);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Passed));
        assert_eq!(view.get(2).unwrap().status(), Some(Status::Idle));
        assert_eq!(registry.updates().len(), 1);
    }

    #[test]
    fn test_method_name_matches_across_classes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "TEST-s.xml",
            &suite("s", &[("A", "testLogin", "pass"), ("B", "testLogin", "fail")]),
        );

        let (mut view, registry) = fixture(vec![case(1, "testLogin")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitMethodNameSeeker::new("*.xml"), &mut view, &mut handle, &mut report);

        // Each match pushes its own update; the last one wins on the entry.
        let statuses: Vec<i32> = registry.updates().iter().map(|u| u.status_id).collect();
        assert_eq!(statuses, vec![Status::Passed.id(), Status::Failed.id()]);
        assert_eq!(view.get(1).unwrap().status(), Some(Status::Failed));
        assert_eq!(report.test_cases().len(), 2);
    }

    #[test]
    fn test_qualified_method_name() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "TEST-s.xml",
            &suite("s", &[("com.A", "ok", "pass"), ("com.A", "bad", "fail"), ("com.A", "later", "skip")]),
        );

        let (mut view, registry) = fixture(vec![
            case(1, "com.A#ok"),
            case(2, "com.A#bad"),
            case(3, "com.A#later"),
            case(4, "ok"),
        ]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(
            dir.path(),
            &JunitQualifiedMethodNameSeeker::new("*.xml"),
            &mut view,
            &mut handle,
            &mut report,
        );

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Passed));
        assert_eq!(view.get(2).unwrap().status(), Some(Status::Failed));
        assert_eq!(view.get(3).unwrap().status(), Some(Status::Idle));
        assert_eq!(view.get(4).unwrap().status(), Some(Status::Idle));
        assert_eq!(registry.updates().len(), 2);
    }

    #[test]
    fn test_suite_name_status() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "TEST-green.xml", &suite("green", &[("A", "a", "pass"), ("A", "b", "skip")]));
        write(dir.path(), "TEST-skipped.xml", &suite("skipped", &[("B", "a", "skip")]));
        write(dir.path(), "TEST-red.xml", &suite("red", &[("C", "a", "pass"), ("C", "b", "fail")]));

        let (mut view, registry) = fixture(vec![
            case(1, "green"),
            case(2, "skipped"),
            case(3, "red"),
        ]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        seek_in(dir.path(), &JunitSuiteNameSeeker::new("TEST-*.xml"), &mut view, &mut handle, &mut report);

        assert_eq!(view.get(1).unwrap().status(), Some(Status::Passed));
        assert_eq!(view.get(2).unwrap().status(), Some(Status::Passed));
        assert_eq!(view.get(3).unwrap().status(), Some(Status::Failed));
    }

    #[test]
    fn test_no_matches_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "TEST-Foo.xml", FOO_PASS);

        let (mut view, registry) = fixture(vec![case(1, "com.example.BarTest")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        let outcome = seek_in(
            dir.path(),
            &JunitClassNameSeeker::new("reports/*.xml"),
            &mut view,
            &mut handle,
            &mut report,
        );

        assert_eq!(outcome, BuildOutcome::Success);
        assert!(registry.updates().is_empty());
        assert_eq!(report, Report::new());
    }

    #[test]
    fn test_malformed_report_marks_unstable_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "TEST-bad.xml", "<testsuite name=\"x\">");
        write(dir.path(), "TEST-Foo.xml", FOO_PASS);

        let (mut view, registry) = fixture(vec![case(1, "com.example.FooTest")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        let outcome = seek_in(
            dir.path(),
            &JunitClassNameSeeker::new("TEST-*.xml"),
            &mut view,
            &mut handle,
            &mut report,
        );

        assert_eq!(outcome, BuildOutcome::Unstable);
        assert_eq!(registry.updates().len(), 1);
    }

    #[test]
    fn test_attach_raw_report() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "TEST-Foo.xml", FOO_PASS);
        let history = ReportHistory::new(dir.path().join(".testopia"));

        let (mut view, registry) = fixture(vec![case(5, "com.example.FooTest")]);
        let mut handle = registry.clone();
        let mut report = Report::new();
        let workspace = LocalWorkspace::new(dir.path());
        let mut ctx =
            SeekContext::new(&mut handle, &workspace, &mut report).with_history(&history);
        JunitClassNameSeeker::new("TEST-*.xml")
            .attach_raw(true)
            .seek(&mut view, &mut ctx)
            .unwrap();

        let attached = history.artifact_dir(10, 5).join("TEST-Foo.xml");
        assert_eq!(std::fs::read_to_string(attached).unwrap(), FOO_PASS);
    }
}
