//! Error types used by the session orchestration engine and its tasks.
//!
//! Two enums cover the whole crate:
//!
//! - [`TaskError`] — failures of individual asynchronous tasks (leaf
//!   operations, composite groups, timeouts, cancellation).
//! - [`SessionError`] — failures of the orchestration layer itself, such as
//!   an incompletely configured controller.
//!
//! Both types provide `as_label`/`as_message` helpers for logging and
//! telemetry. Composites propagate a sub-task's [`TaskError`] unchanged; only
//! the timeout decorator substitutes a cause, and only when its own deadline
//! fired.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by task execution.
///
/// Every task in a connect/update/disconnect graph settles with `Ok(())` or
/// one of these causes. `Timeout` and `Fail` are considered retryable by the
/// reconnect machinery; `Fatal` and `Canceled` are not.
///
/// The type is `Clone` because a barrier-wrapped task hands the identical
/// outcome to every caller that raced on it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The task did not finish before its deadline decorator expired.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error; reconnecting will not help.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The task failed but a later attempt may succeed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The task was canceled before or during execution.
    ///
    /// Cancellation is a control-flow outcome used to unwind sibling and
    /// dependent tasks; it is never reported to observers as a failure.
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for logs and telemetry.
    ///
    /// # Example
    /// ```
    /// use meetvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "canceled".to_string(),
        }
    }

    /// Indicates whether a reconnect attempt may clear the error.
    ///
    /// Returns `true` for [`TaskError::Fail`] and [`TaskError::Timeout`],
    /// `false` otherwise.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Timeout { .. })
    }
}

/// # Errors produced by the orchestration layer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// The controller builder was finalized without a required collaborator.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl SessionError {
    /// Returns a short stable label (snake_case) for logs and telemetry.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::MissingCollaborator(_) => "session_misconfigured",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TaskError::Fail { error: "boom".into() }.is_retryable());
        assert!(TaskError::Timeout { timeout: Duration::from_secs(1) }.is_retryable());
        assert!(!TaskError::Fatal { error: "nope".into() }.is_retryable());
        assert!(!TaskError::Canceled.is_retryable());
    }

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert_eq!(TaskError::Fail { error: "x".into() }.as_label(), "task_failed");
        assert_eq!(
            SessionError::MissingCollaborator("signaling").as_label(),
            "session_misconfigured"
        );
    }
}
