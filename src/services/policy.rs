//! # Bandwidth / subscription policy collaborator.
//!
//! Decides which remote streams the session should receive. The selection
//! algorithm is a black box to the orchestration engine: the policy is an
//! idempotent query ([`BandwidthPolicy::choose`]) and the engine performs the
//! explicit apply step by sending the chosen plan over signaling.

/// Published remote streams the policy may pick from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamIndex {
    /// Identifiers of the currently published remote streams.
    pub streams: Vec<String>,
}

/// Receive set chosen by a [`BandwidthPolicy`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    /// Identifiers of the streams to receive.
    pub streams: Vec<String>,
}

/// Remote-stream selection contract.
pub trait BandwidthPolicy: Send + Sync + 'static {
    /// Feeds the latest published stream index into the policy.
    fn update_index(&self, index: StreamIndex);

    /// Whether the current subscriptions differ from what the policy would
    /// now choose.
    fn wants_resubscribe(&self) -> bool;

    /// Returns the receive set the session should subscribe to.
    ///
    /// Idempotent: calling repeatedly without an intervening
    /// [`update_index`](Self::update_index) returns the same plan. Applying
    /// the plan is the caller's responsibility.
    fn choose(&self) -> SubscriptionPlan;
}
