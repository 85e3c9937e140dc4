//! # Session context: the shared record of one connection attempt.
//!
//! A [`SessionContext`] is created fresh at the start of every connect
//! attempt, handed to the attempt's task graph as `Arc<SessionContext>`, and
//! discarded wholesale when the attempt ends. It is never partially reused
//! across unrelated attempts.
//!
//! ## Field ownership
//! The state machine guarantees at most one high-level operation mutates the
//! context at a time; within that operation, each field has one producing
//! task and downstream consumers:
//!
//! | field                | produced by            | consumed by          |
//! |----------------------|------------------------|----------------------|
//! | `local_description`  | description exchange   | diagnostics          |
//! | `last_subscription`  | subscribe              | diagnostics, updates |
//! | `stats`              | any task (append-only) | telemetry            |
//!
//! The scalar counters in [`SessionStats`] are atomics and, like the
//! read-only [`SessionCapabilities`], exempt from the single-writer rule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::services::{
    BandwidthPolicy, PeerTransport, SessionDescription, SignalingClient, SubscriptionPlan,
};

/// Client capability flags, captured once per attempt.
///
/// Tasks consult these to skip steps the client cannot (or should not)
/// perform; the flags never change while an attempt is running.
#[derive(Clone, Copy, Debug)]
pub struct SessionCapabilities {
    /// Whether the client receives remote media. When `false` the subscribe
    /// phase is skipped entirely, for connects and updates alike.
    pub recv_media: bool,
    /// Whether stream-index updates from the far end may trigger automatic
    /// resubscription while connected.
    pub auto_resubscribe: bool,
}

impl Default for SessionCapabilities {
    /// Both flags default to `true`.
    fn default() -> Self {
        Self { recv_media: true, auto_resubscribe: true }
    }
}

/// Scalar telemetry counters for one connection attempt.
///
/// All fields are atomics: tasks append timings as they complete and the
/// controller snapshots them when the attempt settles.
#[derive(Debug, Default)]
pub struct SessionStats {
    signaling_open_ms: AtomicU64,
    exchange_ms: AtomicU64,
    subscribe_ms: AtomicU64,
}

impl SessionStats {
    /// Records how long opening the signaling channel took.
    pub fn record_signaling_open(&self, elapsed: Duration) {
        self.signaling_open_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Records how long the description exchange took.
    pub fn record_exchange(&self, elapsed: Duration) {
        self.exchange_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Records how long applying subscriptions took.
    pub fn record_subscribe(&self, elapsed: Duration) {
        self.subscribe_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Returns `(signaling_open_ms, exchange_ms, subscribe_ms)`.
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.signaling_open_ms.load(Ordering::Relaxed),
            self.exchange_ms.load(Ordering::Relaxed),
            self.subscribe_ms.load(Ordering::Relaxed),
        )
    }
}

/// Shared mutable record of one connection attempt.
///
/// Owned by the controller, shared by reference with every task executing
/// against the current attempt.
pub struct SessionContext {
    /// Control channel for the attempt.
    pub signaling: Arc<dyn SignalingClient>,
    /// Media transport for the attempt.
    pub transport: Arc<dyn PeerTransport>,
    /// Receive-set decision maker.
    pub bandwidth: Arc<dyn BandwidthPolicy>,
    /// Client capability flags for the attempt.
    pub caps: SessionCapabilities,
    /// Whether this attempt re-establishes a previously connected session.
    pub reconnecting: bool,
    /// Local description produced by the exchange task.
    pub local_description: Mutex<Option<SessionDescription>>,
    /// Receive set most recently applied by the subscribe task.
    pub last_subscription: Mutex<Option<SubscriptionPlan>>,
    /// Append-only attempt counters.
    pub stats: SessionStats,
}

impl SessionContext {
    /// Creates a fresh context for one connect attempt.
    pub fn new(
        signaling: Arc<dyn SignalingClient>,
        transport: Arc<dyn PeerTransport>,
        bandwidth: Arc<dyn BandwidthPolicy>,
        caps: SessionCapabilities,
        reconnecting: bool,
    ) -> Self {
        Self {
            signaling,
            transport,
            bandwidth,
            caps,
            reconnecting,
            local_description: Mutex::new(None),
            last_subscription: Mutex::new(None),
            stats: SessionStats::default(),
        }
    }
}
