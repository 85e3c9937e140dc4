//! # Session lifecycle observers.
//!
//! This module provides the [`Observer`] trait and the [`ObserverSet`]
//! fan-out used to deliver [`Event`](crate::Event)s to application code.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   SessionController ── publish(Event) ──► Bus ──► ObserverSet listener
//!                                                        │
//!                                            snapshot ───┼─── per-observer queues
//!                                                        ▼
//!                                          worker1   worker2   workerN
//!                                             ▼         ▼         ▼
//!                                        obs1.on   obs2.on   obsN.on
//!                                         _event()  _event()  _event()
//! ```
//!
//! Delivery is decoupled from the controller: observer code runs on its own
//! worker and can never re-enter an in-flight state transition.

mod observer;
mod set;

#[cfg(feature = "logging")]
mod log;

pub use observer::Observer;
pub use set::ObserverSet;

#[cfg(feature = "logging")]
pub use log::LogWriter;
