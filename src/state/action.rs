//! # High-level session actions.
//!
//! [`SessionAction`] names every operation the orchestrator may request
//! against a session. Whether an action is allowed, queued, or dropped is
//! decided by the [`SessionStateController`](crate::SessionStateController)
//! from the current [`SessionState`](crate::SessionState).

/// Requested high-level operation against the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Begin a fresh connection attempt.
    Connect,
    /// The in-flight connect or reconnect attempt succeeded.
    FinishConnecting,
    /// Re-negotiate subscriptions on the established session.
    Update,
    /// The in-flight update completed.
    FinishUpdating,
    /// An in-flight operation failed; tear the attempt down.
    Fail,
    /// Leave the session gracefully.
    Disconnect,
    /// Re-establish a session whose connection was lost.
    Reconnect,
    /// Teardown finished; the session is idle again.
    FinishDisconnecting,
}

impl SessionAction {
    /// Returns a short stable label (snake_case) for logs and telemetry.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionAction::Connect => "connect",
            SessionAction::FinishConnecting => "finish_connecting",
            SessionAction::Update => "update",
            SessionAction::FinishUpdating => "finish_updating",
            SessionAction::Fail => "fail",
            SessionAction::Disconnect => "disconnect",
            SessionAction::Reconnect => "reconnect",
            SessionAction::FinishDisconnecting => "finish_disconnecting",
        }
    }
}
