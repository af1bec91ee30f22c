use crate::core::outcome::BuildOutcome;
use crate::registry::TestRegistry;
use crate::report::{Report, ReportHistory};
use crate::workspace::Workspace;
use tracing::debug;

/// Per-build state handed to every result seeker in turn.
///
/// The registry handle and the report are borrowed from the reconciler for
/// the duration of one seek.
pub struct SeekContext<'a> {
    /// Registry that receives status updates.
    pub registry: &'a mut dyn TestRegistry,

    /// Where report files are collected from.
    pub workspace: &'a dyn Workspace,

    /// Shared accumulator for every successful update.
    pub report: &'a mut Report,

    /// History directory, used for raw report attachments.
    pub history: Option<&'a ReportHistory>,

    outcome: BuildOutcome,
}

impl<'a> SeekContext<'a> {
    pub fn new(
        registry: &'a mut dyn TestRegistry,
        workspace: &'a dyn Workspace,
        report: &'a mut Report,
    ) -> Self {
        Self {
            registry,
            workspace,
            report,
            history: None,
            outcome: BuildOutcome::Success,
        }
    }

    /// Enable raw attachments under `history`.
    pub fn with_history(mut self, history: &'a ReportHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Downgrade the build. There is no way back to success.
    pub fn mark_unstable(&mut self) {
        if !self.outcome.is_unstable() {
            debug!("build marked unstable");
        }
        self.outcome = BuildOutcome::Unstable;
    }

    pub fn outcome(&self) -> BuildOutcome {
        self.outcome
    }
}
