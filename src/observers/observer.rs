//! # Session observer trait.
//!
//! Provides [`Observer`], the extension point for reacting to session
//! lifecycle events ("did start connecting", "did start", "did stop",
//! "connection became poor", ...).
//!
//! Each registered observer gets:
//! - **Dedicated worker task** (runs independently of the controller)
//! - **Per-observer bounded queue** (capacity via
//!   [`Observer::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as
//!   [`EventKind::ObserverPanicked`](crate::EventKind::ObserverPanicked))
//!
//! Because delivery happens on the worker, observer code can never re-enter
//! the controller's state machine mid-transition.
//!
//! ## Rules
//! - A slow observer only affects its own queue.
//! - Queue overflow drops the event **for this observer only** and publishes
//!   `EventKind::ObserverOverflow`; other observers are unaffected.
//! - Events are processed sequentially (FIFO) per observer.

use async_trait::async_trait;

use crate::events::Event;

/// Lifecycle observer for a media session.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this observer's queue.
///
/// ## Example
/// ```rust
/// use async_trait::async_trait;
/// use meetvisor::{Event, EventKind, Observer};
///
/// struct Alerts;
///
/// #[async_trait]
/// impl Observer for Alerts {
///     async fn on_event(&self, ev: &Event) {
///         if matches!(ev.kind, EventKind::Stopped) {
///             // page someone, etc.
///         }
///     }
///
///     fn name(&self) -> &'static str { "alerts" }
/// }
/// ```
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, never from the controller's own
    /// flow. Events arrive in FIFO order per observer.
    async fn on_event(&self, event: &Event);

    /// Returns the observer name used in logs and overflow/panic events.
    ///
    /// Prefer short, descriptive names (e.g., "metrics", "ui", "audit").
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer.
    ///
    /// The runtime clamps capacity to a minimum of 1. Default: 256.
    fn queue_capacity(&self) -> usize {
        256
    }
}
