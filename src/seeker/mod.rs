//! Result seekers: match parsed report entries to registry cases by alias.
//!
//! Each seeker collects the report files matching its include pattern,
//! derives a matching key per report entry, and pushes the normalized status
//! of every registry entry whose alias equals that key.

pub mod junit;
pub mod tap;
pub mod testng;

pub use junit::{
    JunitClassNameSeeker, JunitMethodNameSeeker, JunitQualifiedMethodNameSeeker,
    JunitSuiteNameSeeker,
};
pub use tap::TapFileNameSeeker;
pub use testng::{TestngMethodNameSeeker, TestngSuiteNameSeeker};

use crate::config::{SeekerConfig, SeekerKind};
use crate::core::context::SeekContext;
use crate::core::error::Result;
use crate::model::RegistryView;
use crate::parser::{ParsedFile, ReportFormat};
use crate::status::Status;
use crate::workspace::CollectRequest;
use std::fs;
use tracing::{debug, info, warn};

/// A matching strategy for one report format and granularity.
pub trait ResultSeeker {
    /// Collect reports, match them against `view` and push updates.
    ///
    /// Per-file parse failures and per-case update failures are recovered
    /// here and only mark the build unstable. An `Err` means the workspace
    /// itself could not be scanned.
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()>;

    /// Get a human-readable name for this seeker.
    fn name(&self) -> &str;

    /// Ant-style include pattern, relative to the workspace root.
    fn include_pattern(&self) -> &str;
}

/// Create a seeker from its configuration entry.
pub fn create_seeker_from_config(config: &SeekerConfig) -> Result<Box<dyn ResultSeeker>> {
    let pattern = config.include_pattern.as_str();
    let seeker: Box<dyn ResultSeeker> = match config.kind {
        SeekerKind::JunitClassName => {
            Box::new(JunitClassNameSeeker::new(pattern).attach_raw(config.attach_raw))
        }
        SeekerKind::JunitMethodName => {
            Box::new(JunitMethodNameSeeker::new(pattern).attach_raw(config.attach_raw))
        }
        SeekerKind::JunitQualifiedMethodName => {
            Box::new(JunitQualifiedMethodNameSeeker::new(pattern).attach_raw(config.attach_raw))
        }
        SeekerKind::JunitSuiteName => {
            Box::new(JunitSuiteNameSeeker::new(pattern).attach_raw(config.attach_raw))
        }
        SeekerKind::TestngMethodName => Box::new(
            TestngMethodNameSeeker::new(pattern)
                .mark_skipped_as_blocked(config.mark_skipped_as_blocked)
                .attach_raw(config.attach_raw),
        ),
        SeekerKind::TestngSuiteName => Box::new(
            TestngSuiteNameSeeker::new(pattern)
                .mark_skipped_as_blocked(config.mark_skipped_as_blocked)
                .attach_raw(config.attach_raw),
        ),
        SeekerKind::TapFileName => {
            Box::new(TapFileNameSeeker::new(pattern).attach_raw(config.attach_raw))
        }
    };
    Ok(seeker)
}

/// Raw report content kept next to a case it updated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attachment<'f> {
    pub file_name: &'f str,
    pub content: &'f str,
}

impl<'f> Attachment<'f> {
    pub fn of(file: &'f ParsedFile) -> Option<Self> {
        file.raw.as_deref().map(|content| Attachment {
            file_name: file.file_name(),
            content,
        })
    }
}

/// Collect and parse the files matching `include_pattern`.
///
/// Files that failed to parse are logged and mark the build unstable.
pub(crate) fn collect(
    ctx: &mut SeekContext<'_>,
    format: ReportFormat,
    include_pattern: &str,
    include_raw: bool,
) -> Result<Vec<ParsedFile>> {
    let request = CollectRequest {
        include_pattern: include_pattern.to_string(),
        format,
        include_raw,
        excludes: ctx
            .history
            .and_then(|history| history.scan_exclude())
            .map(|pattern| vec![pattern.to_string()])
            .unwrap_or_default(),
    };
    let response = ctx.workspace.collect(&request)?;

    for failure in &response.failures {
        warn!(path = %failure.path, "skipping report: {}", failure.message);
        ctx.mark_unstable();
    }
    if response.files.is_empty() {
        debug!(pattern = include_pattern, "no report files matched");
    }
    for file in &response.files {
        debug!(path = %file.path, "found test result");
    }

    Ok(response.files)
}

/// Log a file whose parsed content does not belong to this seeker's format.
pub(crate) fn wrong_format(ctx: &mut SeekContext<'_>, file: &ParsedFile, expected: ReportFormat) {
    warn!(
        path = %file.path,
        "workspace returned a report that is not {}",
        serde_plain::to_string(&expected).unwrap_or_default()
    );
    ctx.mark_unstable();
}

/// Set `status` on every entry aliased `key` and push it upstream.
///
/// Idle results are recorded on the entry but never sent. An update that
/// fails marks the build unstable and leaves the report untouched; the
/// remaining entries are still processed. Returns the number of entries
/// updated upstream.
pub(crate) fn apply_status(
    view: &mut RegistryView,
    key: &str,
    status: Status,
    ctx: &mut SeekContext<'_>,
    attachment: Option<Attachment<'_>>,
) -> usize {
    let mut updated = 0;
    for id in view.ids_with_alias(key) {
        let Some(entry) = view.get_mut(id) else {
            continue;
        };
        entry.set_status(status);
        if !status.is_evaluated() {
            debug!(case_id = id, alias = key, "result not evaluated, not updating");
            continue;
        }

        info!(case_id = id, alias = key, "updating automated test case: {}", status.label());
        match ctx.registry.update(entry) {
            Ok(()) => {
                ctx.report.add_test_case(entry.clone());
                updated += 1;
                if let Some(attachment) = attachment {
                    write_attachment(ctx, entry.run_id(), id, attachment);
                }
            }
            Err(e) => {
                warn!(case_id = id, "failed to update test case: {e}");
                ctx.mark_unstable();
            }
        }
    }
    updated
}

fn write_attachment(ctx: &mut SeekContext<'_>, run_id: i32, case_id: i32, attachment: Attachment<'_>) {
    let Some(history) = ctx.history else {
        return;
    };
    let dir = history.artifact_dir(run_id, case_id);
    let written = fs::create_dir_all(&dir)
        .and_then(|()| fs::write(dir.join(attachment.file_name), attachment.content));
    match written {
        Ok(()) => debug!(case_id, file = attachment.file_name, "attached raw report"),
        Err(e) => {
            warn!(case_id, "failed to attach {}: {e}", attachment.file_name);
            ctx.mark_unstable();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::outcome::BuildOutcome;
    use crate::report::{Report, ReportHistory};
    use crate::workspace::LocalWorkspace;

    #[test]
    fn test_factory_maps_every_kind() {
        let kinds = [
            (SeekerKind::JunitClassName, "junit-class-name"),
            (SeekerKind::JunitMethodName, "junit-method-name"),
            (SeekerKind::JunitQualifiedMethodName, "junit-qualified-method-name"),
            (SeekerKind::JunitSuiteName, "junit-suite-name"),
            (SeekerKind::TestngMethodName, "testng-method-name"),
            (SeekerKind::TestngSuiteName, "testng-suite-name"),
            (SeekerKind::TapFileName, "tap-file-name"),
        ];
        for (kind, name) in kinds {
            let seeker = create_seeker_from_config(&SeekerConfig::new(kind, "**/*")).unwrap();
            assert_eq!(seeker.name(), name);
            assert_eq!(seeker.include_pattern(), "**/*");
        }
    }

    #[test]
    fn test_apply_status_updates_every_alias_match() {
        let (mut view, registry) = fixture(vec![case(1, "shared"), case(2, "shared"), case(3, "x")]);
        let mut handle = registry.clone();
        let workspace = LocalWorkspace::new("/nonexistent");
        let mut report = Report::new();
        let mut ctx = SeekContext::new(&mut handle, &workspace, &mut report);

        let updated = apply_status(&mut view, "shared", Status::Passed, &mut ctx, None);
        assert_eq!(updated, 2);
        assert_eq!(ctx.outcome(), BuildOutcome::Success);
        assert_eq!(report.test_cases().len(), 2);

        let ids: Vec<i32> = registry.updates().iter().map(|u| u.case_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(view.get(3).unwrap().status(), Some(Status::Idle));
    }

    #[test]
    fn test_apply_status_idle_is_not_pushed() {
        let (mut view, registry) = fixture(vec![case(1, "a")]);
        let mut handle = registry.clone();
        let workspace = LocalWorkspace::new("/nonexistent");
        let mut report = Report::new();
        let mut ctx = SeekContext::new(&mut handle, &workspace, &mut report);

        assert_eq!(apply_status(&mut view, "a", Status::Idle, &mut ctx, None), 0);
        assert!(registry.updates().is_empty());
        assert!(report.test_cases().is_empty());
    }

    #[test]
    fn test_apply_status_update_failure_continues() {
        let (mut view, registry) = fixture(vec![case(1, "a"), case(2, "a")]);
        let mut handle = registry.clone().with_failing_update(1);
        let workspace = LocalWorkspace::new("/nonexistent");
        let mut report = Report::new();
        let mut ctx = SeekContext::new(&mut handle, &workspace, &mut report);

        assert_eq!(apply_status(&mut view, "a", Status::Failed, &mut ctx, None), 1);
        assert_eq!(ctx.outcome(), BuildOutcome::Unstable);
        assert_eq!(report.test_cases().len(), 1);
        assert_eq!(report.test_cases()[0].id(), 2);
        assert_eq!(registry.updates().len(), 1);
    }

    #[test]
    fn test_apply_status_writes_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let history = ReportHistory::new(dir.path().join(".testopia"));
        let (mut view, registry) = fixture(vec![case(4, "a")]);
        let mut handle = registry.clone();
        let workspace = LocalWorkspace::new(dir.path());
        let mut report = Report::new();
        let mut ctx =
            SeekContext::new(&mut handle, &workspace, &mut report).with_history(&history);

        let attachment = Attachment {
            file_name: "a.tap",
            content: "1..1\nok 1\n",
        };
        apply_status(&mut view, "a", Status::Passed, &mut ctx, Some(attachment));

        let written = history.artifact_dir(10, 4).join("a.tap");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "1..1\nok 1\n");
    }

    #[test]
    fn test_collect_skips_history_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "t/a.tap", "1..1\nok 1\n");
        write(dir.path(), ".testopia/artifacts/10/4/a.tap", "1..1\nnot ok 1\n");
        let history = ReportHistory::new(dir.path().join(".testopia")).within_workspace(dir.path());

        let (_, mut registry) = fixture(Vec::new());
        let workspace = LocalWorkspace::new(dir.path());
        let mut report = Report::new();
        let mut ctx = SeekContext::new(&mut registry, &workspace, &mut report).with_history(&history);

        let files = collect(&mut ctx, ReportFormat::Tap, "**/*.tap", false).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["t/a.tap"]);
    }

    #[test]
    fn test_collect_marks_parse_failures_unstable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.tap", "1..1\nok 1\n");
        write(dir.path(), "bad.tap", "1..1\n1..2\n");

        let (_, mut registry) = fixture(Vec::new());
        let workspace = LocalWorkspace::new(dir.path());
        let mut report = Report::new();
        let mut ctx = SeekContext::new(&mut registry, &workspace, &mut report);

        let files = collect(&mut ctx, ReportFormat::Tap, "*.tap", false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "good.tap");
        assert_eq!(ctx.outcome(), BuildOutcome::Unstable);
    }
}
