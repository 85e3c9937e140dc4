//! # Session-scoped shared state.
//!
//! This module provides:
//! - [`SessionContext`] - the single mutable record one connect attempt's
//!   tasks read and populate
//! - [`SessionStats`] - append-only scalar counters for the attempt
//! - [`SessionCapabilities`] - read-only client capability flags

mod context;

pub use context::{SessionCapabilities, SessionContext, SessionStats};
