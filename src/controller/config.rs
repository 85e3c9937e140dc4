//! # Session controller configuration.
//!
//! Provides [`SessionConfig`], the centralized knobs for one controller:
//! per-phase deadlines for the connect graph, the cleanup budget, event bus
//! capacity, and the reconnect budget.
//!
//! Every phase of a connect attempt is deadline-wrapped; the whole attempt is
//! additionally bounded by [`SessionConfig::connect_timeout`], so a wedged
//! collaborator can never hold the session state machine hostage.

use std::time::Duration;

use crate::reconnect::ReconnectConfig;
use crate::session::SessionCapabilities;

/// Configuration for a [`SessionController`](crate::SessionController).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Deadline for a whole connect attempt (all phases together).
    pub connect_timeout: Duration,

    /// Deadline for opening the signaling channel.
    pub signaling_open_timeout: Duration,

    /// Deadline for transport creation and for the description exchange
    /// (applied to each phase separately).
    pub media_setup_timeout: Duration,

    /// Deadline for applying the chosen subscriptions.
    pub subscribe_timeout: Duration,

    /// Budget for best-effort teardown after failure or disconnect. Cleanup
    /// problems are published as events, never re-thrown.
    pub cleanup_timeout: Duration,

    /// Capacity of the event bus ring buffer (min 1; clamped).
    ///
    /// Observers that lag more than `bus_capacity` events behind skip the
    /// oldest items.
    pub bus_capacity: usize,

    /// Retry budget and pacing after session failures.
    pub reconnect: ReconnectConfig,

    /// Client capability flags copied into every attempt's context.
    pub capabilities: SessionCapabilities,
}

impl SessionConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SessionConfig {
    /// Default configuration:
    ///
    /// - `connect_timeout = 15s`
    /// - `signaling_open_timeout = 5s`
    /// - `media_setup_timeout = 5s`
    /// - `subscribe_timeout = 5s`
    /// - `cleanup_timeout = 3s`
    /// - `bus_capacity = 256`
    /// - `reconnect = ReconnectConfig::default()` (8 attempts / 2 min)
    /// - `capabilities = SessionCapabilities::default()` (all enabled)
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            signaling_open_timeout: Duration::from_secs(5),
            media_setup_timeout: Duration::from_secs(5),
            subscribe_timeout: Duration::from_secs(5),
            cleanup_timeout: Duration::from_secs(3),
            bus_capacity: 256,
            reconnect: ReconnectConfig::default(),
            capabilities: SessionCapabilities::default(),
        }
    }
}
