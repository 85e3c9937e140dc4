//! # Lifecycle events emitted by the session controller.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Lifecycle events**: session flow (connecting, started, updated,
//!   stopped)
//! - **Recovery events**: connection loss and reconnect pacing
//! - **Plumbing events**: cleanup problems and observer delivery issues
//!
//! The [`Event`] struct carries optional metadata such as the terminal
//! status, reconnect delay, attempt counts, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are consumed
//! from independent observer queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::controller::SessionStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of session events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle ===
    /// A connect (or reconnect) attempt began.
    ///
    /// Sets: `reconnecting`, `attempt` (for reconnects), `at`, `seq`.
    ConnectingStarted,

    /// The session is established and media is flowing.
    ///
    /// Sets: `at`, `seq`.
    Started,

    /// A subscription update began.
    ///
    /// Sets: `at`, `seq`.
    UpdateStarted,

    /// The subscription update was applied.
    ///
    /// Sets: `at`, `seq`.
    Updated,

    /// The session ended; exactly one per session, with the terminal status.
    ///
    /// Sets: `status`, `at`, `seq`.
    Stopped,

    // === Recovery ===
    /// The established session lost its signaling connection.
    ///
    /// Sets: `reason`, `at`, `seq`.
    ConnectionInterrupted,

    /// Connection quality degraded enough that recovery was initiated.
    ///
    /// Sets: `at`, `seq`.
    ConnectionBecamePoor,

    /// A reconnect attempt was scheduled.
    ///
    /// Sets: `delay_ms`, `attempt`, `reason` (failure label), `at`, `seq`.
    ReconnectScheduled,

    /// The retry budget is spent; no further attempts will be made.
    ///
    /// Sets: `attempt`, `at`, `seq`.
    ReconnectGaveUp,

    // === Plumbing ===
    /// A best-effort cleanup step failed (logged, never re-thrown).
    ///
    /// Sets: `task`, `reason`, `at`, `seq`.
    CleanupFailed,

    /// An observer dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (observer name), `reason`, `at`, `seq`.
    ObserverOverflow,

    /// An observer panicked while processing an event.
    ///
    /// Sets: `task` (observer name), `reason`, `at`, `seq`.
    ObserverPanicked,
}

/// Session event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Terminal session status (set on `Stopped`).
    pub status: Option<SessionStatus>,
    /// Human-readable reason (failure labels, cleanup details, etc.).
    pub reason: Option<Arc<str>>,
    /// Task or observer name, if applicable.
    pub task: Option<Arc<str>>,
    /// Reconnect attempt count.
    pub attempt: Option<u32>,
    /// Reconnect delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Whether the connect attempt is a reconnect.
    pub reconnecting: Option<bool>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            status: None,
            reason: None,
            task: None,
            attempt: None,
            delay_ms: None,
            reconnecting: None,
        }
    }

    /// Attaches a terminal session status.
    #[inline]
    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task or observer name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a reconnect attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a reconnect delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Marks whether the connect attempt is a reconnect.
    #[inline]
    pub fn with_reconnecting(mut self, reconnecting: bool) -> Self {
        self.reconnecting = Some(reconnecting);
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_task(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_task(observer)
            .with_reason(info)
    }

    #[inline]
    pub(crate) fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }
}
