//! # Task graphs for the high-level session operations.
//!
//! Builds the concrete task trees the controller runs: leaf tasks that drive
//! one collaborator each, composed with the serial/parallel/timeout/once
//! combinators.
//!
//! ```text
//! connect = Timeout[
//!     Serial[
//!         Parallel[ Timeout(Once(open-signaling)), Timeout(create-transport) ],
//!         Timeout(exchange-descriptions),
//!         Timeout(subscribe),
//!     ]
//! ]
//! ```
//!
//! Leaf tasks subscribe to the signaling event stream **before** issuing the
//! request whose completion event they await, so the answer cannot slip past
//! them.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::controller::config::SessionConfig;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::services::{
    PeerTransport, SignalEvent, SignalMessage, SignalingClient,
};
use crate::session::SessionContext;
use crate::tasks::{OnceTask, ParallelGroup, SerialGroup, Task, TaskRef, TimeoutTask};

/// Waits for the signaling event `extract` accepts, honoring cancellation.
///
/// An unsolicited `Closed` event fails the wait; so does the end of the
/// event stream.
async fn await_signal<T, F>(
    rx: &mut broadcast::Receiver<SignalEvent>,
    token: &CancellationToken,
    mut extract: F,
) -> Result<T, TaskError>
where
    F: FnMut(&SignalEvent) -> Option<T>,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => return Err(TaskError::Canceled),
            ev = rx.recv() => match ev {
                Ok(ev) => {
                    if let Some(out) = extract(&ev) {
                        return Ok(out);
                    }
                    if matches!(ev, SignalEvent::Closed { .. }) {
                        return Err(TaskError::Fail { error: "signaling closed".into() });
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(TaskError::Fail { error: "signaling event stream ended".into() });
                }
            }
        }
    }
}

/// Opens the signaling channel and waits for it to report `Opened`.
///
/// A channel that is already open (pre-warmed or kept across a reconnect) is
/// a no-op success.
pub(crate) struct OpenSignalingTask {
    ctx: Arc<SessionContext>,
}

impl OpenSignalingTask {
    pub(crate) fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Task for OpenSignalingTask {
    fn name(&self) -> &str {
        "open-signaling"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        if self.ctx.signaling.is_open() {
            return Ok(());
        }
        let mut rx = self.ctx.signaling.subscribe();
        let started = Instant::now();
        self.ctx.signaling.open().await?;
        await_signal(&mut rx, &ctx, |ev| {
            matches!(ev, SignalEvent::Opened).then_some(())
        })
        .await?;
        self.ctx.stats.record_signaling_open(started.elapsed());
        Ok(())
    }
}

/// Allocates the peer media transport.
pub(crate) struct CreateTransportTask {
    ctx: Arc<SessionContext>,
}

impl CreateTransportTask {
    pub(crate) fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Task for CreateTransportTask {
    fn name(&self) -> &str {
        "create-transport"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        self.ctx.transport.create().await?;
        Ok(())
    }
}

/// Produces the local description, sends it as an offer, waits for the
/// remote answer and applies it.
pub(crate) struct ExchangeDescriptionsTask {
    ctx: Arc<SessionContext>,
}

impl ExchangeDescriptionsTask {
    pub(crate) fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Task for ExchangeDescriptionsTask {
    fn name(&self) -> &str {
        "exchange-descriptions"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        let mut rx = self.ctx.signaling.subscribe();
        let started = Instant::now();

        let offer = self.ctx.transport.describe().await?;
        *self.ctx.local_description.lock().unwrap() = Some(offer.clone());
        self.ctx.signaling.send(SignalMessage::Offer(offer)).await?;

        let remote = await_signal(&mut rx, &ctx, |ev| match ev {
            SignalEvent::Message(SignalMessage::Answer(desc)) => Some(desc.clone()),
            _ => None,
        })
        .await?;
        self.ctx.transport.exchange(remote).await?;
        self.ctx.stats.record_exchange(started.elapsed());
        Ok(())
    }
}

/// Sends the policy's chosen receive set and waits for the acknowledgement.
///
/// A client without the receive-media capability skips the phase outright.
pub(crate) struct SubscribeTask {
    ctx: Arc<SessionContext>,
}

impl SubscribeTask {
    pub(crate) fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Task for SubscribeTask {
    fn name(&self) -> &str {
        "subscribe"
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        if !self.ctx.caps.recv_media {
            return Ok(());
        }
        let mut rx = self.ctx.signaling.subscribe();
        let started = Instant::now();

        let plan = self.ctx.bandwidth.choose();
        self.ctx
            .signaling
            .send(SignalMessage::Subscribe(plan.clone()))
            .await?;
        await_signal(&mut rx, &ctx, |ev| {
            matches!(ev, SignalEvent::Message(SignalMessage::SubscribeAck)).then_some(())
        })
        .await?;

        *self.ctx.last_subscription.lock().unwrap() = Some(plan);
        self.ctx.stats.record_subscribe(started.elapsed());
        Ok(())
    }
}

/// Best-effort teardown. Close failures are published as `CleanupFailed`
/// events and never returned; the task itself always succeeds.
pub(crate) struct CleanupTask {
    transport: Arc<dyn PeerTransport>,
    signaling: Arc<dyn SignalingClient>,
    bus: Bus,
    close_signaling: bool,
    send_leave: bool,
}

impl CleanupTask {
    pub(crate) fn new(
        transport: Arc<dyn PeerTransport>,
        signaling: Arc<dyn SignalingClient>,
        bus: Bus,
        close_signaling: bool,
        send_leave: bool,
    ) -> Self {
        Self { transport, signaling, bus, close_signaling, send_leave }
    }

    fn report(&self, step: &'static str, reason: String) {
        self.bus
            .publish(Event::new(EventKind::CleanupFailed).with_task(step).with_reason(reason));
    }
}

#[async_trait]
impl Task for CleanupTask {
    fn name(&self) -> &str {
        "cleanup"
    }

    async fn run(&self, _ctx: CancellationToken) -> Result<(), TaskError> {
        if self.send_leave && self.signaling.is_open() {
            if let Err(e) = self.signaling.send(SignalMessage::Leave).await {
                self.report("send-leave", e.to_string());
            }
        }
        if let Err(e) = self.transport.close().await {
            self.report("close-transport", e.to_string());
        }
        if self.close_signaling {
            if let Err(e) = self.signaling.close().await {
                self.report("close-signaling", e.to_string());
            }
        }
        Ok(())
    }
}

/// Builds the connect attempt graph against a fresh context.
///
/// `signaling_gate` is the once-wrapped open task; keeping the wrapper across
/// reconnect attempts is what lets a still-open signaling connection be
/// reused without re-running the open work.
pub(crate) fn connect_graph(
    ctx: &Arc<SessionContext>,
    signaling_gate: Arc<OnceTask>,
    cfg: &SessionConfig,
) -> TaskRef {
    let setup: TaskRef = Arc::new(ParallelGroup::new(
        "session-setup",
        vec![
            Arc::new(TimeoutTask::new(signaling_gate, cfg.signaling_open_timeout)) as TaskRef,
            Arc::new(TimeoutTask::new(
                Arc::new(CreateTransportTask::new(Arc::clone(ctx))),
                cfg.media_setup_timeout,
            )) as TaskRef,
        ],
    ));
    let negotiate: TaskRef = Arc::new(TimeoutTask::new(
        Arc::new(ExchangeDescriptionsTask::new(Arc::clone(ctx))),
        cfg.media_setup_timeout,
    ));
    let subscribe: TaskRef = Arc::new(TimeoutTask::new(
        Arc::new(SubscribeTask::new(Arc::clone(ctx))),
        cfg.subscribe_timeout,
    ));

    Arc::new(TimeoutTask::new(
        Arc::new(SerialGroup::new("connect", vec![setup, negotiate, subscribe])),
        cfg.connect_timeout,
    ))
}

/// Builds the subscription update graph.
pub(crate) fn update_graph(ctx: &Arc<SessionContext>, cfg: &SessionConfig) -> TaskRef {
    Arc::new(TimeoutTask::new(
        Arc::new(SerialGroup::new(
            "update",
            vec![Arc::new(SubscribeTask::new(Arc::clone(ctx))) as TaskRef],
        )),
        cfg.subscribe_timeout,
    ))
}

/// Builds the bounded best-effort cleanup graph.
pub(crate) fn cleanup_graph(
    transport: Arc<dyn PeerTransport>,
    signaling: Arc<dyn SignalingClient>,
    bus: Bus,
    cfg: &SessionConfig,
    close_signaling: bool,
    send_leave: bool,
) -> TaskRef {
    Arc::new(TimeoutTask::new(
        Arc::new(CleanupTask::new(transport, signaling, bus, close_signaling, send_leave)),
        cfg.cleanup_timeout,
    ))
}
