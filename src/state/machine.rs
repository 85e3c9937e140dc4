//! # Session state controller.
//!
//! A finite state machine gating which high-level action may execute against
//! the shared session context at any instant. The controller, not the caller,
//! is the sole authority on whether a requested action proceeds, is queued,
//! or is dropped.
//!
//! ## States and transitions
//! ```text
//!                Connect                FinishConnecting
//! NotConnected ──────────► Connecting ──────────────────► Connected
//!      ▲                       │                        │  ▲      │
//!      │                       │ Fail        Disconnect │  │      │ Update
//!      │                       ▼                        │  │      ▼
//!      │ FinishDisconnecting                            │  │   Updating
//!      └───────────────── Disconnecting ◄───────────────┘  │      │
//!                              ▲     ▲          Reconnect  │      │ FinishUpdating
//!                              │     │ Fail                │      │ (back to Connected)
//!                              │  Reconnecting ◄───────────┴──────┘
//!                              │     │
//!                              │     │ FinishConnecting (back to Connected)
//!                              └─────┘
//! ```
//!
//! ## Deferral
//! A deferrable action requested while an incompatible operation is in flight
//! (for example `Update` while already `Updating`) is queued rather than
//! dropped. At most **one** deferred action is retained; a later deferrable
//! request replaces the earlier one (last wins). The queued action replays
//! when the in-flight operation's terminal action transitions; if it is no
//! longer legal at that point it is dropped silently.
//!
//! ## Rules
//! - At most one `work` closure runs against the session context at a time.
//! - Illegal, non-deferrable requests never invoke their `work` closure.
//! - "Legally redundant" requests (disconnect while idle) are dropped
//!   silently as [`Transition::NoTransition`].

use std::sync::Mutex;

use crate::state::action::SessionAction;

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Idle; both the initial state and the state after teardown.
    #[default]
    NotConnected,
    /// A fresh connection attempt is in flight.
    Connecting,
    /// The session is established.
    Connected,
    /// A subscription update is in flight.
    Updating,
    /// Teardown (graceful or after failure) is in flight.
    Disconnecting,
    /// A lost connection is being re-established.
    Reconnecting,
}

impl SessionState {
    /// Returns a short stable label (snake_case) for logs and telemetry.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionState::NotConnected => "not_connected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Updating => "updating",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Reconnecting => "reconnecting",
        }
    }
}

/// Outcome of a [`SessionStateController::perform`] request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The action was legal; the state moved and `work` was invoked.
    Transitioned,
    /// The action was queued to replay after the in-flight operation.
    Deferred,
    /// The action was illegal and not deferrable; `work` was never invoked.
    NoTransition,
}

type Work = Box<dyn FnOnce() + Send + 'static>;

/// Resulting state for a legal (state, action) pair, `None` otherwise.
fn next_state(state: SessionState, action: SessionAction) -> Option<SessionState> {
    use SessionAction as A;
    use SessionState as S;

    match (state, action) {
        (S::NotConnected, A::Connect) => Some(S::Connecting),
        (S::Connecting | S::Reconnecting, A::FinishConnecting) => Some(S::Connected),
        (S::Connected, A::Update) => Some(S::Updating),
        (S::Updating, A::FinishUpdating) => Some(S::Connected),
        (
            S::Connecting | S::Connected | S::Updating | S::Reconnecting,
            A::Fail,
        ) => Some(S::Disconnecting),
        (S::Connected, A::Disconnect) => Some(S::Disconnecting),
        (S::Connected, A::Reconnect) => Some(S::Reconnecting),
        (S::Disconnecting, A::FinishDisconnecting) => Some(S::NotConnected),
        _ => None,
    }
}

/// Whether an illegal request may be queued until the in-flight operation
/// completes: the action targets a state that becomes reachable once the
/// blocking operation's terminal action fires.
fn is_deferrable(state: SessionState, action: SessionAction) -> bool {
    use SessionAction as A;
    use SessionState as S;

    matches!(
        (state, action),
        (
            S::Connecting | S::Updating | S::Reconnecting,
            A::Update | A::Disconnect
        )
    )
}

/// Terminal actions resolve an in-flight operation; a queued deferred action
/// replays right after one of these transitions.
fn is_terminal(action: SessionAction) -> bool {
    matches!(
        action,
        SessionAction::FinishConnecting
            | SessionAction::FinishUpdating
            | SessionAction::FinishDisconnecting
    )
}

struct Inner {
    state: SessionState,
    deferred: Option<(SessionAction, Work)>,
}

/// Gatekeeper finite state machine for high-level session actions.
pub struct SessionStateController {
    inner: Mutex<Inner>,
}

impl SessionStateController {
    /// Creates a controller in [`SessionState::NotConnected`].
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { state: SessionState::NotConnected, deferred: None }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }

    /// Requests `action` and invokes `work` if the transition is granted.
    ///
    /// - Legal action: the state moves first, then `work` runs —
    ///   [`Transition::Transitioned`].
    /// - Illegal but deferrable action: `(action, work)` is queued, replacing
    ///   any earlier queued pair, and replays after the in-flight operation's
    ///   terminal action — [`Transition::Deferred`].
    /// - Otherwise: nothing happens and `work` is dropped —
    ///   [`Transition::NoTransition`].
    pub fn perform<F>(&self, action: SessionAction, work: F) -> Transition
    where
        F: FnOnce() + Send + 'static,
    {
        let replay = {
            let mut inner = self.inner.lock().unwrap();
            match next_state(inner.state, action) {
                Some(next) => {
                    inner.state = next;
                    if is_terminal(action) { inner.deferred.take() } else { None }
                }
                None if is_deferrable(inner.state, action) => {
                    // last-wins: the newest request reflects current intent
                    inner.deferred = Some((action, Box::new(work)));
                    return Transition::Deferred;
                }
                None => return Transition::NoTransition,
            }
        };

        work();
        if let Some((deferred_action, deferred_work)) = replay {
            self.replay(deferred_action, deferred_work);
        }
        Transition::Transitioned
    }

    /// Replays a queued action after a terminal transition. Dropped silently
    /// if the state it waited for never materialized.
    fn replay(&self, action: SessionAction, work: Work) {
        let granted = {
            let mut inner = self.inner.lock().unwrap();
            match next_state(inner.state, action) {
                Some(next) => {
                    inner.state = next;
                    true
                }
                None => false,
            }
        };
        if granted {
            work();
        }
    }
}

impl Default for SessionStateController {
    fn default() -> Self {
        Self::new()
    }
}
