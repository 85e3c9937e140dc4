//! # meetvisor
//!
//! **meetvisor** is a real-time media session orchestration library for Rust.
//!
//! It establishes, maintains, updates, and tears down a multi-party
//! audio/video session over a signaling channel and a peer media transport,
//! recovering from failures with jittered backoff. Device handling, codec
//! selection, and wire formats stay outside: the engine consumes them
//! through narrow collaborator traits.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!    connect() / update() / disconnect() / reconnect()
//!                        │
//!                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SessionController (orchestrator)                                 │
//! │  - SessionStateController (gates one operation at a time)         │
//! │  - ReconnectController (retry budget + jittered backoff)          │
//! │  - Bus (broadcast events)                                         │
//! │  - ObserverSet (fans out to registered observers)                 │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │  builds per operation
//!        ▼
//!   Timeout[ Serial[ Parallel[ Once(open-signaling), create-transport ],
//!            exchange-descriptions, subscribe ] ]
//!        │  runs against
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SessionContext (one per attempt)                                 │
//! │  SignalingClient · PeerTransport · BandwidthPolicy · stats        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! connect() ──► Connecting ──► Connected ◄──► Updating
//!                  │               │
//!                  │ Fail          │ Reconnect / Disconnect
//!                  ▼               ▼
//!             Disconnecting ◄─ Reconnecting
//!                  │
//!                  ▼
//!             NotConnected ──► (retry via ReconnectController, or Stopped)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                                   |
//! |-------------------|-------------------------------------------------------------------|------------------------------------------------------|
//! | **Tasks**         | Cancelable task graphs: serial, parallel, timeout, once barrier.  | [`Task`], [`SerialGroup`], [`ParallelGroup`], [`TimeoutTask`], [`OnceTask`] |
//! | **State gating**  | One in-flight operation; defer or drop the rest.                  | [`SessionStateController`], [`SessionAction`], [`Transition`] |
//! | **Reconnect**     | Attempt/elapsed budgets and jittered exponential backoff.         | [`ReconnectController`], [`BackoffPolicy`], [`JitterPolicy`] |
//! | **Observability** | Sequenced lifecycle events fanned out to isolated observers.      | [`Event`], [`EventKind`], [`Observer`], [`ObserverSet`] |
//! | **Collaborators** | Narrow contracts for signaling, transport, policy, telemetry.     | [`SignalingClient`], [`PeerTransport`], [`BandwidthPolicy`], [`TelemetrySink`] |
//! | **Errors**        | Typed causes; cancellation is control flow, not failure.          | [`TaskError`], [`SessionError`], [`SessionStatus`]   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] observer _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use meetvisor::{EventKind, SessionConfig, SessionControllerBuilder};
//!
//! # async fn demo(
//! #     signaling: Arc<dyn meetvisor::SignalingClient>,
//! #     transport: Arc<dyn meetvisor::PeerTransport>,
//! #     bandwidth: Arc<dyn meetvisor::BandwidthPolicy>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let controller = SessionControllerBuilder::new(SessionConfig::default())
//!     .with_signaling(signaling)
//!     .with_transport(transport)
//!     .with_bandwidth_policy(bandwidth)
//!     .build()?;
//!
//! let mut events = controller.events();
//! controller.connect();
//!
//! while let Ok(ev) = events.recv().await {
//!     match ev.kind {
//!         EventKind::Started => println!("session is up"),
//!         EventKind::Stopped => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod controller;
mod error;
mod events;
mod observers;
mod policies;
mod reconnect;
mod services;
mod session;
mod state;
mod tasks;

// ---- Public re-exports ----

pub use controller::{SessionConfig, SessionController, SessionControllerBuilder, SessionStatus};
pub use error::{SessionError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use observers::{Observer, ObserverSet};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use reconnect::{ReconnectConfig, ReconnectController};
pub use services::{
    BandwidthPolicy, NoopTelemetry, PeerTransport, SessionDescription, SignalError, SignalEvent,
    SignalMessage, SignalingClient, StreamIndex, SubscriptionPlan, TelemetrySink, TransportError,
};
pub use session::{SessionCapabilities, SessionContext, SessionStats};
pub use state::{SessionAction, SessionState, SessionStateController, Transition};
pub use tasks::{OnceTask, ParallelGroup, SerialGroup, Task, TaskFn, TaskRef, TimeoutTask};

// Optional: expose the simple built-in stdout observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
