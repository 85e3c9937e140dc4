//! # Peer media transport collaborator.
//!
//! The peer connection the session's media flows over. Codec and bitrate
//! selection live behind this contract; the orchestration engine only drives
//! the lifecycle: create the transport, produce a local description, apply a
//! remote one, close.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::TaskError;

/// Opaque negotiated description of one side of the media transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDescription {
    /// Serialized description blob; the engine never inspects it.
    pub blob: String,
}

impl SessionDescription {
    /// Wraps a serialized description.
    pub fn new(blob: impl Into<String>) -> Self {
        Self { blob: blob.into() }
    }
}

/// Errors raised by a peer transport.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying peer connection could not be allocated.
    #[error("transport create failed: {0}")]
    Create(String),
    /// A local description could not be produced.
    #[error("transport describe failed: {0}")]
    Describe(String),
    /// The remote description could not be applied.
    #[error("transport exchange failed: {0}")]
    Exchange(String),
    /// The transport could not be closed cleanly.
    #[error("transport close failed: {0}")]
    Close(String),
}

impl From<TransportError> for TaskError {
    fn from(err: TransportError) -> Self {
        TaskError::Fail { error: format!("transport: {err}") }
    }
}

/// Media-transport contract consumed by connect/disconnect tasks.
///
/// Any rejection is treated as the calling task's failure.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    /// Allocates the underlying peer connection.
    async fn create(&self) -> Result<(), TransportError>;

    /// Produces the local session description for negotiation.
    async fn describe(&self) -> Result<SessionDescription, TransportError>;

    /// Applies the remote session description, completing negotiation.
    async fn exchange(&self, remote: SessionDescription) -> Result<(), TransportError>;

    /// Releases the underlying peer connection. Idempotent.
    async fn close(&self) -> Result<(), TransportError>;
}
