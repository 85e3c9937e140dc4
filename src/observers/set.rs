//! # Non-blocking event fan-out to registered observers.
//!
//! [`ObserverSet`] distributes session events to every registered observer
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │  (snapshot of the current registrations)
//!     ├──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!     │    (bounded)         └──────► panic → ObserverPanicked
//!     ├──► [queue 2] ──► worker 2 ──► observer2.on_event()
//!     └──► [queue N] ──► worker N ──► observerN.on_event()
//! ```
//!
//! ## Rules
//! - **Snapshot-then-notify**: `emit` copies the registration list before
//!   dispatch, so `add`/`remove` during notification cannot corrupt the
//!   iteration.
//! - **No cross-observer ordering**: observer A may process event N while B
//!   is still on N-5; per-observer order is FIFO.
//! - **Overflow**: the event is dropped for that observer only and an
//!   `ObserverOverflow` event is published.
//! - **Isolation**: a slow or panicking observer does not affect the others
//!   and cannot re-enter the controller.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};
use crate::observers::observer::Observer;

/// Per-observer channel and worker metadata.
struct Registration {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

/// Fan-out coordinator for registered observers.
pub struct ObserverSet {
    registrations: Mutex<Vec<Registration>>,
    bus: Bus,
}

impl ObserverSet {
    /// Creates an empty set publishing delivery problems to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self { registrations: Mutex::new(Vec::new()), bus }
    }

    /// Registers an observer and spawns its dedicated worker.
    ///
    /// The worker drains the observer's bounded queue until the observer is
    /// removed or the set shuts down. Panics inside `on_event` are caught and
    /// published as `ObserverPanicked`.
    pub fn add(&self, observer: Arc<dyn Observer>) {
        let cap = observer.queue_capacity().max(1);
        let name = observer.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
        let bus = self.bus.clone();

        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = observer.on_event(ev.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    let info = {
                        let any = &*panic_err;
                        if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        }
                    };
                    bus.publish(Event::observer_panicked(observer.name(), info));
                }
            }
        });

        self.registrations
            .lock()
            .unwrap()
            .push(Registration { name, sender: tx, worker });
    }

    /// Removes all observers registered under `name`.
    ///
    /// Their workers finish draining whatever is already queued, then exit.
    pub fn remove(&self, name: &str) {
        self.registrations.lock().unwrap().retain(|r| r.name != name);
    }

    /// Number of currently registered observers.
    pub fn len(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    /// Whether the set has no registered observers.
    pub fn is_empty(&self) -> bool {
        self.registrations.lock().unwrap().is_empty()
    }

    /// Emits an event to every registered observer (non-blocking).
    ///
    /// Uses `try_send` per queue. On a full or closed queue the event is
    /// dropped for that observer and an `ObserverOverflow` event is
    /// published — except for overflow events themselves, which are never
    /// re-reported.
    pub fn emit(&self, event: &Event) {
        let is_overflow_evt = event.is_observer_overflow();
        let event = Arc::new(event.clone());

        // snapshot before dispatch; add/remove may run concurrently
        let targets: Vec<(&'static str, mpsc::Sender<Arc<Event>>)> = self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.name, r.sender.clone()))
            .collect();

        for (name, sender) in targets {
            match sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_overflow_evt {
                        self.bus.publish(Event::observer_overflow(name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_overflow_evt {
                        self.bus.publish(Event::observer_overflow(name, "closed"));
                    }
                }
            }
        }
    }

    /// Spawns the listener that forwards bus events into this set.
    ///
    /// Call once during controller construction.
    pub fn spawn_listener(self: &Arc<Self>, bus: &Bus) {
        let mut rx = bus.subscribe();
        let set = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Gracefully shuts down all observer workers.
    ///
    /// 1. Drops all queue senders (workers see the channel closed)
    /// 2. Awaits all worker tasks to finish draining
    pub async fn shutdown(&self) {
        let drained: Vec<Registration> =
            self.registrations.lock().unwrap().drain(..).collect();
        for r in drained {
            drop(r.sender);
            let _ = r.worker.await;
        }
    }
}
