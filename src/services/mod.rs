//! # External collaborator contracts.
//!
//! The orchestration engine does not define a wire format, a codec selection
//! algorithm, or a metrics pipeline. It consumes those capabilities through
//! the narrow contracts in this module:
//!
//! - [`SignalingClient`] - control channel (open/send/close + event stream)
//! - [`PeerTransport`] - media transport lifecycle (create/describe/exchange/close)
//! - [`BandwidthPolicy`] - remote-stream selection (idempotent query + explicit apply)
//! - [`TelemetrySink`] - fire-and-forget event publishing
//!
//! Implementations live with the application; everything here is a trait the
//! controller's task graphs call into.

mod policy;
mod signaling;
mod telemetry;
mod transport;

pub use policy::{BandwidthPolicy, StreamIndex, SubscriptionPlan};
pub use signaling::{SignalError, SignalEvent, SignalMessage, SignalingClient};
pub use telemetry::{NoopTelemetry, TelemetrySink};
pub use transport::{PeerTransport, SessionDescription, TransportError};
