//! Seeker over TAP streams, keyed by file name.

use super::{Attachment, ResultSeeker, apply_status, collect, wrong_format};
use crate::core::context::SeekContext;
use crate::core::error::Result;
use crate::model::RegistryView;
use crate::parser::{Directive, ParsedReport, ReportFormat, TapSet};
use crate::status::Status;
use tracing::info;

/// Matches the file name of each TAP stream, minus its last extension.
#[derive(Debug, Clone)]
pub struct TapFileNameSeeker {
    include_pattern: String,
    attach_raw: bool,
}

impl TapFileNameSeeker {
    pub fn new(include_pattern: impl Into<String>) -> Self {
        Self {
            include_pattern: include_pattern.into(),
            attach_raw: false,
        }
    }

    pub fn attach_raw(mut self, attach_raw: bool) -> Self {
        self.attach_raw = attach_raw;
        self
    }
}

/// `basic.tap` -> `basic`, `suite.1.tap` -> `suite.1`, `README` -> `README`.
pub fn file_key(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
}

/// Skips win over failures: a skipped plan or any SKIP result blocks the
/// whole stream, even one with not-ok lines.
pub fn set_status(set: &TapSet) -> Status {
    if set.plan_skipped() || set.has_directive(Directive::Skip) {
        Status::Blocked
    } else if set.contains_not_ok() || set.contains_bail_out() || set.has_directive(Directive::Todo) {
        Status::Failed
    } else {
        Status::Passed
    }
}

impl ResultSeeker for TapFileNameSeeker {
    fn seek(&self, view: &mut RegistryView, ctx: &mut SeekContext<'_>) -> Result<()> {
        info!("looking for TAP streams");
        let files = collect(ctx, ReportFormat::Tap, &self.include_pattern, self.attach_raw)?;
        for file in &files {
            let ParsedReport::Tap(set) = &file.report else {
                wrong_format(ctx, file, ReportFormat::Tap);
                continue;
            };
            let key = file_key(file.file_name());
            apply_status(view, key, set_status(set), ctx, Attachment::of(file));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tap-file-name"
    }

    fn include_pattern(&self) -> &str {
        &self.include_pattern
    }
}
