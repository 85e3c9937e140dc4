//! # Terminal session status.
//!
//! Exactly one [`SessionStatus`] is reported per session (on the `Stopped`
//! event), no matter how many internal sub-task failures contributed to the
//! outcome. Cancellation is internal control flow and maps to a graceful
//! [`SessionStatus::Left`], never to a failure.

use crate::error::TaskError;

/// Categorized terminal outcome of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// The session ended gracefully (local leave).
    Left,
    /// The session ended because a deadline-wrapped phase did not finish in
    /// time and the retry budget could not recover it.
    TimedOut,
    /// The session ended on an unrecovered failure.
    Failed {
        /// Human-readable cause description.
        reason: String,
    },
}

impl SessionStatus {
    /// Returns a short stable label (snake_case) for logs and telemetry.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionStatus::Left => "left",
            SessionStatus::TimedOut => "timed_out",
            SessionStatus::Failed { .. } => "failed",
        }
    }

    /// Categorizes the task cause that terminated the session.
    pub fn from_cause(cause: &TaskError) -> Self {
        match cause {
            TaskError::Timeout { .. } => SessionStatus::TimedOut,
            TaskError::Canceled => SessionStatus::Left,
            other => SessionStatus::Failed { reason: other.as_message() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cause_categorization() {
        assert_eq!(
            SessionStatus::from_cause(&TaskError::Timeout { timeout: Duration::from_secs(1) }),
            SessionStatus::TimedOut
        );
        assert_eq!(SessionStatus::from_cause(&TaskError::Canceled), SessionStatus::Left);
        assert!(matches!(
            SessionStatus::from_cause(&TaskError::Fail { error: "x".into() }),
            SessionStatus::Failed { .. }
        ));
    }
}
