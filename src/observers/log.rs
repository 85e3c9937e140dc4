//! # Simple logging observer for debugging and demos.
//!
//! [`LogWriter`] prints session events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [connecting] reconnecting=false
//! [started]
//! [interrupted] reason="signaling closed"
//! [reconnect-scheduled] delay_ms=400 attempt=1 reason="task_timeout"
//! [stopped] status="left"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::observer::Observer;

/// Simple stdout logging observer.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Observer`] for structured logging or metrics.
pub struct LogWriter;

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ConnectingStarted => {
                println!(
                    "[connecting] reconnecting={}",
                    e.reconnecting.unwrap_or(false)
                );
            }
            EventKind::Started => println!("[started]"),
            EventKind::UpdateStarted => println!("[update-started]"),
            EventKind::Updated => println!("[updated]"),
            EventKind::Stopped => {
                let status = e.status.as_ref().map(|s| s.as_label()).unwrap_or("?");
                println!("[stopped] status={status:?}");
            }
            EventKind::ConnectionInterrupted => {
                println!("[interrupted] reason={:?}", e.reason);
            }
            EventKind::ConnectionBecamePoor => println!("[connection-poor]"),
            EventKind::ReconnectScheduled => {
                println!(
                    "[reconnect-scheduled] delay_ms={:?} attempt={:?} reason={:?}",
                    e.delay_ms, e.attempt, e.reason
                );
            }
            EventKind::ReconnectGaveUp => {
                println!("[reconnect-gave-up] attempt={:?}", e.attempt);
            }
            EventKind::CleanupFailed => {
                println!("[cleanup-failed] task={:?} reason={:?}", e.task, e.reason);
            }
            EventKind::ObserverOverflow => {
                println!("[observer-overflow] observer={:?} reason={:?}", e.task, e.reason);
            }
            EventKind::ObserverPanicked => {
                println!("[observer-panicked] observer={:?} reason={:?}", e.task, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
