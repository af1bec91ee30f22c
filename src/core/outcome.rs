use std::fmt;

/// Aggregate result of a reconciliation build.
///
/// Fatal problems never reach this type; they surface as an `Err` from
/// [`Reconciler::run`](crate::core::Reconciler::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildOutcome {
    #[default]
    Success,
    /// At least one recoverable failure was met along the way.
    Unstable,
}

impl BuildOutcome {
    /// Process exit code for the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            BuildOutcome::Success => 0,
            BuildOutcome::Unstable => 2,
        }
    }

    pub fn is_unstable(self) -> bool {
        self == BuildOutcome::Unstable
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Success => write!(f, "SUCCESS"),
            BuildOutcome::Unstable => write!(f, "UNSTABLE"),
        }
    }
}
