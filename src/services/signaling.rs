//! # Signaling-channel collaborator.
//!
//! The control channel a session negotiates over. The wire format is the
//! implementation's business; the orchestration engine only sends
//! [`SignalMessage`] values and awaits specific [`SignalEvent`]s (opened, a
//! particular inbound message, closed) as task completion signals.
//!
//! The event-subscription interface follows the crate's bus idiom: a
//! broadcast receiver per interested party, created **before** the request
//! that should produce the awaited event so nothing is missed.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::error::TaskError;
use crate::services::policy::{StreamIndex, SubscriptionPlan};
use crate::services::transport::SessionDescription;

/// Outbound control message.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalMessage {
    /// Local session description, opening negotiation.
    Offer(SessionDescription),
    /// Remote session description, answering negotiation.
    Answer(SessionDescription),
    /// Requested receive set.
    Subscribe(SubscriptionPlan),
    /// Acknowledgement of an applied receive set.
    SubscribeAck,
    /// Published remote streams changed (inbound only).
    IndexUpdate(StreamIndex),
    /// Graceful leave notice.
    Leave,
}

/// Inbound connection-lifecycle and message events.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalEvent {
    /// The channel finished opening and is ready for traffic.
    Opened,
    /// An inbound control message arrived.
    Message(SignalMessage),
    /// The channel closed; `graceful` distinguishes a requested close from a
    /// dropped connection.
    Closed {
        /// Whether the close was locally requested.
        graceful: bool,
    },
}

/// Errors raised by a signaling client.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SignalError {
    /// The channel could not be opened.
    #[error("signaling open failed: {0}")]
    Open(String),
    /// The channel is not open.
    #[error("signaling channel not open")]
    NotOpen,
    /// A message could not be sent.
    #[error("signaling send failed: {0}")]
    Send(String),
    /// The channel could not be closed cleanly.
    #[error("signaling close failed: {0}")]
    Close(String),
}

impl From<SignalError> for TaskError {
    fn from(err: SignalError) -> Self {
        TaskError::Fail { error: format!("signaling: {err}") }
    }
}

/// Control-channel contract consumed by connect/update/disconnect tasks.
///
/// Any rejection is treated as the calling task's failure.
#[async_trait]
pub trait SignalingClient: Send + Sync + 'static {
    /// Starts opening the channel. Completion is signaled by
    /// [`SignalEvent::Opened`] on the subscription stream.
    async fn open(&self) -> Result<(), SignalError>;

    /// Sends a control message.
    async fn send(&self, msg: SignalMessage) -> Result<(), SignalError>;

    /// Closes the channel; a [`SignalEvent::Closed`] with `graceful = true`
    /// follows.
    async fn close(&self) -> Result<(), SignalError>;

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;

    /// Creates a receiver for connection-lifecycle and inbound-message
    /// events. Subscribe before issuing the request whose completion event
    /// you intend to await.
    fn subscribe(&self) -> broadcast::Receiver<SignalEvent>;
}
