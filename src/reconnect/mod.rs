//! # Reconnect decisions after session failure.
//!
//! This module provides:
//! - [`ReconnectController`] - retry eligibility and cancelable scheduling
//! - [`ReconnectConfig`] - attempt/elapsed budgets and backoff pacing
//!
//! Pacing itself lives in [`crate::policies`].

mod controller;

pub use controller::{ReconnectConfig, ReconnectController};
