//! # Builder for wiring a session controller.
//!
//! Collects the collaborators and configuration, then assembles the event
//! bus, observer fan-out, state machine, and reconnect controller into an
//! `Arc<SessionController>`. Must be finalized inside a tokio runtime (the
//! observer listener is spawned during `build`).

use std::sync::Arc;

use crate::controller::config::SessionConfig;
use crate::controller::core::SessionController;
use crate::error::SessionError;
use crate::events::Bus;
use crate::observers::{Observer, ObserverSet};
use crate::services::{
    BandwidthPolicy, NoopTelemetry, PeerTransport, SignalingClient, TelemetrySink,
};

/// Builder for constructing a [`SessionController`].
///
/// ## Example
/// ```no_run
/// # use std::sync::Arc;
/// # use meetvisor::{SessionConfig, SessionControllerBuilder};
/// # fn demo(
/// #     signaling: Arc<dyn meetvisor::SignalingClient>,
/// #     transport: Arc<dyn meetvisor::PeerTransport>,
/// #     bandwidth: Arc<dyn meetvisor::BandwidthPolicy>,
/// # ) -> Result<(), meetvisor::SessionError> {
/// let controller = SessionControllerBuilder::new(SessionConfig::default())
///     .with_signaling(signaling)
///     .with_transport(transport)
///     .with_bandwidth_policy(bandwidth)
///     .build()?;
/// controller.connect();
/// # Ok(())
/// # }
/// ```
pub struct SessionControllerBuilder {
    cfg: SessionConfig,
    signaling: Option<Arc<dyn SignalingClient>>,
    transport: Option<Arc<dyn PeerTransport>>,
    bandwidth: Option<Arc<dyn BandwidthPolicy>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    observers: Vec<Arc<dyn Observer>>,
}

impl SessionControllerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            cfg,
            signaling: None,
            transport: None,
            bandwidth: None,
            telemetry: None,
            observers: Vec::new(),
        }
    }

    /// Sets the signaling-channel collaborator (required).
    pub fn with_signaling(mut self, signaling: Arc<dyn SignalingClient>) -> Self {
        self.signaling = Some(signaling);
        self
    }

    /// Sets the peer media transport collaborator (required).
    pub fn with_transport(mut self, transport: Arc<dyn PeerTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the bandwidth/subscription policy collaborator (required).
    pub fn with_bandwidth_policy(mut self, bandwidth: Arc<dyn BandwidthPolicy>) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    /// Sets the telemetry sink. Defaults to a no-op sink.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Registers a lifecycle observer. May be called repeatedly.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Builds the controller and starts its observer fan-out.
    ///
    /// Fails with [`SessionError::MissingCollaborator`] if a required
    /// collaborator was not provided.
    pub fn build(self) -> Result<Arc<SessionController>, SessionError> {
        let signaling = self
            .signaling
            .ok_or(SessionError::MissingCollaborator("signaling"))?;
        let transport = self
            .transport
            .ok_or(SessionError::MissingCollaborator("transport"))?;
        let bandwidth = self
            .bandwidth
            .ok_or(SessionError::MissingCollaborator("bandwidth policy"))?;
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Arc::new(NoopTelemetry));

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let observers = Arc::new(ObserverSet::new(bus.clone()));
        for observer in self.observers {
            observers.add(observer);
        }
        observers.spawn_listener(&bus);

        Ok(Arc::new(SessionController::new_internal(
            self.cfg,
            bus,
            observers,
            telemetry,
            signaling,
            transport,
            bandwidth,
        )))
    }
}
