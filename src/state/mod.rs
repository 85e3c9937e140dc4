//! # Session lifecycle state machine.
//!
//! This module provides:
//! - [`SessionState`] - the finite set of lifecycle states
//! - [`SessionAction`] - the high-level operations that drive transitions
//! - [`SessionStateController`] - the gatekeeper deciding whether a requested
//!   action runs, is queued, or is dropped
//! - [`Transition`] - the outcome of such a request

mod action;
mod machine;

pub use action::SessionAction;
pub use machine::{SessionState, SessionStateController, Transition};
