//! # Telemetry sink collaborator.
//!
//! Fire-and-forget event publishing. The trait is infallible: whatever the
//! sink does with an event (batch, drop, ship), problems must never propagate
//! back into the orchestration flow.

/// Fire-and-forget telemetry publishing.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Publishes one named event with flat attributes.
    ///
    /// Must not block; implementations should hand the event off to their own
    /// queue or worker.
    fn publish(&self, name: &'static str, attributes: &[(&'static str, String)]);
}

/// Sink that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn publish(&self, _name: &'static str, _attributes: &[(&'static str, String)]) {}
}
