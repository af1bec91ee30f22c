//! Shared status taxonomy every report format is normalized into.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status of a test case run, as understood by Testopia.
///
/// The discriminants are Testopia's `case_run_status_id` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not run, or not evaluated.
    #[default]
    Idle = 1,
    Passed = 2,
    Failed = 3,
    Blocked = 6,
}

impl Status {
    /// Numeric status id sent to the registry.
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Map a registry status id back onto the taxonomy.
    ///
    /// Ids outside the taxonomy (running, paused, error) return `None`.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Status::Idle),
            2 => Some(Status::Passed),
            3 => Some(Status::Failed),
            6 => Some(Status::Blocked),
            _ => None,
        }
    }

    /// Human-readable label used in summaries.
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "Not Run",
            Status::Passed => "Passed",
            Status::Failed => "Failed",
            Status::Blocked => "Blocked",
        }
    }

    /// Whether a case with this status should be pushed upstream.
    pub fn is_evaluated(self) -> bool {
        self != Status::Idle
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids_round_trip() {
        for status in [Status::Idle, Status::Passed, Status::Failed, Status::Blocked] {
            assert_eq!(Status::from_id(status.id()), Some(status));
        }
    }

    #[test]
    fn test_unknown_status_id() {
        assert_eq!(Status::from_id(4), None);
        assert_eq!(Status::from_id(0), None);
        assert_eq!(Status::from_id(-1), None);
    }

    #[test]
    fn test_default_is_idle() {
        assert_eq!(Status::default(), Status::Idle);
        assert!(!Status::default().is_evaluated());
        assert!(Status::Blocked.is_evaluated());
    }

    #[test]
    fn test_status_from_plain_string() {
        let status: Status = serde_plain::from_str("blocked").unwrap();
        assert_eq!(status, Status::Blocked);
        assert_eq!(serde_plain::to_string(&Status::Passed).unwrap(), "passed");
    }
}
