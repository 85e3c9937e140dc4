//! # Session controller: composes tasks, state gating, and reconnect.
//!
//! [`SessionController`] is the orchestration layer. Every public operation
//! goes through the same shape:
//!
//! ```text
//! connect()/update()/disconnect()/reconnect()
//!     │
//!     ▼
//! SessionStateController::perform(action, work)
//!     ├─ Transitioned  → work spawns the operation's task graph
//!     ├─ Deferred      → queued; replays after the in-flight operation
//!     └─ NoTransition  → dropped silently
//!
//! task graph settles
//!     ├─ Ok  → perform(Finish*) → publish event, notify observers
//!     └─ Err → perform(Fail) → bounded cleanup → FinishDisconnecting
//!                  │
//!                  ▼
//!          ReconnectController::retry_with_backoff
//!              ├─ Some(delay) → ReconnectScheduled, retry re-enters connect
//!              └─ None        → ReconnectGaveUp → Stopped(status)
//! ```
//!
//! ## Rules
//! - The state controller guarantees at most one operation mutates the
//!   session context at a time; a competing request defers or is dropped,
//!   never runs concurrently.
//! - Exactly one `Stopped` event (with one categorized status) is published
//!   per session, no matter how many sub-task failures contributed.
//! - Cleanup is best-effort and deadline-bounded; its failures are published
//!   as `CleanupFailed`, never re-thrown.
//! - A still-open signaling channel is reused across reconnect attempts via
//!   the once-wrapped open task.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::controller::config::SessionConfig;
use crate::controller::graph::{self, OpenSignalingTask};
use crate::controller::status::SessionStatus;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::observers::{Observer, ObserverSet};
use crate::reconnect::ReconnectController;
use crate::services::{
    BandwidthPolicy, PeerTransport, SignalEvent, SignalMessage, SignalingClient, TelemetrySink,
};
use crate::session::SessionContext;
use crate::state::{SessionAction, SessionState, SessionStateController, Transition};
use crate::tasks::{OnceTask, Task};

/// Live pieces of the connect attempt currently owning the context.
struct Attempt {
    ctx: Arc<SessionContext>,
    token: CancellationToken,
}

/// Orchestrates connect / update / disconnect / reconnect for one session.
pub struct SessionController {
    cfg: SessionConfig,
    state: SessionStateController,
    reconnect_ctl: ReconnectController,
    bus: Bus,
    observers: Arc<ObserverSet>,
    telemetry: Arc<dyn TelemetrySink>,
    signaling: Arc<dyn SignalingClient>,
    transport: Arc<dyn PeerTransport>,
    bandwidth: Arc<dyn BandwidthPolicy>,
    current: Mutex<Option<Attempt>>,
    signaling_gate: Mutex<Option<Arc<OnceTask>>>,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        cfg: SessionConfig,
        bus: Bus,
        observers: Arc<ObserverSet>,
        telemetry: Arc<dyn TelemetrySink>,
        signaling: Arc<dyn SignalingClient>,
        transport: Arc<dyn PeerTransport>,
        bandwidth: Arc<dyn BandwidthPolicy>,
    ) -> Self {
        let reconnect_ctl = ReconnectController::new(cfg.reconnect);
        Self {
            cfg,
            state: SessionStateController::new(),
            reconnect_ctl,
            bus,
            observers,
            telemetry,
            signaling,
            transport,
            bandwidth,
            current: Mutex::new(None),
            signaling_gate: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.state()
    }

    /// Creates a receiver for the controller's event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Registers a lifecycle observer.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.observers.add(observer);
    }

    /// Removes all observers registered under `name`.
    pub fn remove_observer(&self, name: &str) {
        self.observers.remove(name);
    }

    /// Begins a fresh connection attempt.
    ///
    /// Legal only while idle; the attempt itself runs in the background and
    /// reports through events/observers.
    pub fn connect(self: &Arc<Self>) -> Transition {
        let this = Arc::clone(self);
        self.state.perform(SessionAction::Connect, move || {
            tokio::spawn(async move { this.run_connect(false).await });
        })
    }

    /// Re-negotiates subscriptions on the established session.
    ///
    /// Requested while another update (or a connect) is in flight, the call
    /// defers and replays once; it never runs concurrently.
    pub fn update(self: &Arc<Self>) -> Transition {
        let this = Arc::clone(self);
        self.state.perform(SessionAction::Update, move || {
            tokio::spawn(async move { this.run_update().await });
        })
    }

    /// Leaves the session gracefully.
    ///
    /// Disables reconnecting first, so a pending retry timer is dropped even
    /// when the request itself is redundant (already idle).
    pub fn disconnect(self: &Arc<Self>) -> Transition {
        let retry_was_pending = self.reconnect_ctl.cancel();
        self.reconnect_ctl.disable();

        let this = Arc::clone(self);
        let transition = self.state.perform(SessionAction::Disconnect, move || {
            tokio::spawn(async move { this.run_disconnect().await });
        });

        if transition == Transition::NoTransition && retry_was_pending {
            // the canceled retry was the only live activity; report the stop
            self.finalize_stop(SessionStatus::Left);
        }
        transition
    }

    /// Forces re-establishment of the established session.
    pub fn reconnect(self: &Arc<Self>) -> Transition {
        let this = Arc::clone(self);
        self.state.perform(SessionAction::Reconnect, move || {
            tokio::spawn(async move { this.run_reconnect().await });
        })
    }

    // ---- operation bodies ------------------------------------------------

    async fn run_connect(self: Arc<Self>, reconnecting: bool) {
        if !reconnecting {
            self.reconnect_ctl.reset();
        }
        self.bus.publish(
            Event::new(EventKind::ConnectingStarted)
                .with_reconnecting(reconnecting)
                .with_attempt(self.reconnect_ctl.attempts()),
        );
        self.telemetry.publish(
            "session_connect_start",
            &[("reconnecting", reconnecting.to_string())],
        );

        let (ctx, token) = self.begin_attempt(reconnecting);
        let gate = self.signaling_gate(&ctx, reconnecting);
        let connect = graph::connect_graph(&ctx, gate, &self.cfg);

        match connect.run(token.child_token()).await {
            Ok(()) => {
                let this = Arc::clone(&self);
                let monitor_token = token.clone();
                let (open_ms, exchange_ms, subscribe_ms) = ctx.stats.snapshot();
                let _ = self.state.perform(SessionAction::FinishConnecting, move || {
                    this.bus.publish(Event::new(EventKind::Started));
                    this.telemetry.publish(
                        "session_started",
                        &[
                            ("signaling_open_ms", open_ms.to_string()),
                            ("exchange_ms", exchange_ms.to_string()),
                            ("subscribe_ms", subscribe_ms.to_string()),
                        ],
                    );
                    this.spawn_monitor(monitor_token);
                });
            }
            Err(cause) => self.handle_failure(cause).await,
        }
    }

    async fn run_update(self: Arc<Self>) {
        self.bus.publish(Event::new(EventKind::UpdateStarted));

        let attempt = {
            let current = self.current.lock().unwrap();
            current.as_ref().map(|a| (Arc::clone(&a.ctx), a.token.clone()))
        };
        let Some((ctx, token)) = attempt else {
            let _ = self.state.perform(SessionAction::FinishUpdating, || {});
            return;
        };

        if !ctx.bandwidth.wants_resubscribe() {
            let this = Arc::clone(&self);
            let _ = self.state.perform(SessionAction::FinishUpdating, move || {
                this.bus.publish(Event::new(EventKind::Updated));
            });
            return;
        }

        let update = graph::update_graph(&ctx, &self.cfg);
        match update.run(token.child_token()).await {
            Ok(()) => {
                let this = Arc::clone(&self);
                let _ = self.state.perform(SessionAction::FinishUpdating, move || {
                    this.bus.publish(Event::new(EventKind::Updated));
                    this.telemetry.publish("session_updated", &[]);
                });
            }
            Err(cause) => self.handle_failure(cause).await,
        }
    }

    async fn run_disconnect(self: Arc<Self>) {
        // stop the monitor and anything else tied to the attempt
        if let Some(attempt) = self.current.lock().unwrap().as_ref() {
            attempt.token.cancel();
        }
        self.run_cleanup(true, true).await;
        let _ = self.state.perform(SessionAction::FinishDisconnecting, || {});
        self.finalize_stop(SessionStatus::Left);
    }

    async fn run_reconnect(self: Arc<Self>) {
        // the old attempt's monitor and transport are stale
        if let Some(attempt) = self.current.lock().unwrap().as_ref() {
            attempt.token.cancel();
        }
        self.run_cleanup(false, false).await;
        self.run_connect(true).await;
    }

    /// Failure tail shared by connect and update: `Fail` transition, bounded
    /// cleanup, teardown transition, then the retry decision.
    async fn handle_failure(self: &Arc<Self>, cause: TaskError) {
        if self.state.perform(SessionAction::Fail, || {}) != Transition::Transitioned {
            // a competing teardown already owns the session
            return;
        }
        self.telemetry.publish(
            "session_attempt_failed",
            &[("cause", cause.as_label().to_string())],
        );

        // close the transport; signaling stays up so a retry can reuse it
        self.run_cleanup(false, false).await;
        let _ = self.state.perform(SessionAction::FinishDisconnecting, || {});

        let status = SessionStatus::from_cause(&cause);
        if !cause.is_retryable() {
            self.close_signaling().await;
            self.finalize_stop(status);
            return;
        }

        let retry = {
            let this = Arc::clone(self);
            move || {
                let runner = Arc::clone(&this);
                let _ = this.state.perform(SessionAction::Connect, move || {
                    tokio::spawn(async move { runner.run_connect(true).await });
                });
            }
        };
        let give_up = {
            let this = Arc::clone(self);
            let status = status.clone();
            move || {
                this.bus.publish(
                    Event::new(EventKind::ReconnectGaveUp)
                        .with_attempt(this.reconnect_ctl.attempts()),
                );
                tokio::spawn(async move {
                    this.close_signaling().await;
                    this.finalize_stop(status);
                });
            }
        };

        if let Some(delay) = self.reconnect_ctl.retry_with_backoff(retry, give_up) {
            self.bus.publish(
                Event::new(EventKind::ReconnectScheduled)
                    .with_delay(delay)
                    .with_attempt(self.reconnect_ctl.attempts())
                    .with_reason(cause.as_label()),
            );
        }
    }

    // ---- attempt plumbing ------------------------------------------------

    /// Creates a fresh context and root token, replacing (and canceling) any
    /// previous attempt.
    fn begin_attempt(&self, reconnecting: bool) -> (Arc<SessionContext>, CancellationToken) {
        let ctx = Arc::new(SessionContext::new(
            Arc::clone(&self.signaling),
            Arc::clone(&self.transport),
            Arc::clone(&self.bandwidth),
            self.cfg.capabilities,
            reconnecting,
        ));
        let token = CancellationToken::new();

        let mut current = self.current.lock().unwrap();
        if let Some(old) = current.take() {
            old.token.cancel();
        }
        *current = Some(Attempt { ctx: Arc::clone(&ctx), token: token.clone() });
        (ctx, token)
    }

    /// Returns the once-wrapped signaling open task, reusing the existing
    /// wrapper when a reconnect finds the channel still open and the previous
    /// open settled successfully.
    fn signaling_gate(&self, ctx: &Arc<SessionContext>, reconnecting: bool) -> Arc<OnceTask> {
        let mut gate = self.signaling_gate.lock().unwrap();
        if reconnecting && self.signaling.is_open() {
            if let Some(existing) = gate.as_ref() {
                if matches!(existing.settled(), Some(Ok(()))) {
                    return Arc::clone(existing);
                }
            }
        }
        let fresh = Arc::new(OnceTask::new(
            "open-signaling",
            Arc::new(OpenSignalingTask::new(Arc::clone(ctx))),
            Vec::new(),
        ));
        *gate = Some(Arc::clone(&fresh));
        fresh
    }

    async fn run_cleanup(&self, close_signaling: bool, send_leave: bool) {
        let cleanup = graph::cleanup_graph(
            Arc::clone(&self.transport),
            Arc::clone(&self.signaling),
            self.bus.clone(),
            &self.cfg,
            close_signaling,
            send_leave,
        );
        if let Err(e) = cleanup.run(CancellationToken::new()).await {
            self.bus.publish(
                Event::new(EventKind::CleanupFailed)
                    .with_task("cleanup")
                    .with_reason(e.as_label()),
            );
        }
    }

    async fn close_signaling(&self) {
        if let Err(e) = self.signaling.close().await {
            self.bus.publish(
                Event::new(EventKind::CleanupFailed)
                    .with_task("close-signaling")
                    .with_reason(e.to_string()),
            );
        }
    }

    /// Publishes the single terminal `Stopped` event and drops attempt state.
    fn finalize_stop(&self, status: SessionStatus) {
        if let Some(attempt) = self.current.lock().unwrap().take() {
            attempt.token.cancel();
        }
        *self.signaling_gate.lock().unwrap() = None;
        self.telemetry.publish(
            "session_stopped",
            &[("status", status.as_label().to_string())],
        );
        self.bus.publish(Event::new(EventKind::Stopped).with_status(status));
    }

    /// Watches the signaling stream while connected: stream-index updates
    /// feed the bandwidth policy (resubscribing when it asks to), connection
    /// loss drives the reconnect path, a remote graceful close drives
    /// teardown.
    fn spawn_monitor(self: &Arc<Self>, token: CancellationToken) {
        let this = Arc::clone(self);
        let mut rx = self.signaling.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Ok(SignalEvent::Closed { graceful }) => {
                            if this.state.state() == SessionState::Connected {
                                this.on_connection_lost(graceful);
                            }
                            break;
                        }
                        Ok(SignalEvent::Message(SignalMessage::IndexUpdate(index))) => {
                            this.bandwidth.update_index(index);
                            if this.cfg.capabilities.auto_resubscribe
                                && this.bandwidth.wants_resubscribe()
                            {
                                // defers automatically if an update is in flight
                                let _ = this.update();
                            }
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    fn on_connection_lost(self: &Arc<Self>, graceful: bool) {
        self.bus.publish(
            Event::new(EventKind::ConnectionInterrupted).with_reason(if graceful {
                "signaling closed by remote"
            } else {
                "signaling connection lost"
            }),
        );
        if graceful {
            // the far end ended the session; tear down locally
            let this = Arc::clone(self);
            let _ = self.state.perform(SessionAction::Disconnect, move || {
                tokio::spawn(async move { this.run_disconnect().await });
            });
            return;
        }
        self.bus.publish(Event::new(EventKind::ConnectionBecamePoor));
        let this = Arc::clone(self);
        let _ = self.state.perform(SessionAction::Reconnect, move || {
            tokio::spawn(async move { this.run_reconnect().await });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::builder::SessionControllerBuilder;
    use crate::policies::{BackoffPolicy, JitterPolicy};
    use crate::reconnect::ReconnectConfig;
    use crate::services::{
        SessionDescription, SignalError, SignalMessage, StreamIndex, SubscriptionPlan,
        TransportError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    // ---- fake collaborators ---------------------------------------------

    struct FakeSignaling {
        tx: broadcast::Sender<SignalEvent>,
        open: AtomicBool,
        open_calls: AtomicU32,
        fail_opens_remaining: AtomicU32,
        subscribe_ack_delay: Mutex<Duration>,
        sent: Mutex<Vec<SignalMessage>>,
    }

    impl FakeSignaling {
        fn new() -> Arc<Self> {
            let (tx, _rx) = broadcast::channel(64);
            Arc::new(Self {
                tx,
                open: AtomicBool::new(false),
                open_calls: AtomicU32::new(0),
                fail_opens_remaining: AtomicU32::new(0),
                subscribe_ack_delay: Mutex::new(Duration::ZERO),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn fail_next_opens(&self, n: u32) {
            self.fail_opens_remaining.store(n, Ordering::SeqCst);
        }

        fn set_subscribe_ack_delay(&self, d: Duration) {
            *self.subscribe_ack_delay.lock().unwrap() = d;
        }

        fn sent_count(&self, pred: impl Fn(&SignalMessage) -> bool) -> usize {
            self.sent.lock().unwrap().iter().filter(|m| pred(m)).count()
        }

        /// Simulates losing the connection underneath an established session.
        fn drop_connection(&self) {
            self.open.store(false, Ordering::SeqCst);
            let _ = self.tx.send(SignalEvent::Closed { graceful: false });
        }
    }

    #[async_trait]
    impl SignalingClient for FakeSignaling {
        async fn open(&self) -> Result<(), SignalError> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_opens_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_opens_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(SignalError::Open("connection refused".into()));
            }
            self.open.store(true, Ordering::SeqCst);
            let _ = self.tx.send(SignalEvent::Opened);
            Ok(())
        }

        async fn send(&self, msg: SignalMessage) -> Result<(), SignalError> {
            if !self.is_open() {
                return Err(SignalError::NotOpen);
            }
            self.sent.lock().unwrap().push(msg.clone());
            match msg {
                SignalMessage::Offer(_) => {
                    let _ = self.tx.send(SignalEvent::Message(SignalMessage::Answer(
                        SessionDescription::new("answer"),
                    )));
                }
                SignalMessage::Subscribe(_) => {
                    let delay = *self.subscribe_ack_delay.lock().unwrap();
                    let tx = self.tx.clone();
                    if delay.is_zero() {
                        let _ = tx.send(SignalEvent::Message(SignalMessage::SubscribeAck));
                    } else {
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = tx.send(SignalEvent::Message(SignalMessage::SubscribeAck));
                        });
                    }
                }
                _ => {}
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), SignalError> {
            self.open.store(false, Ordering::SeqCst);
            let _ = self.tx.send(SignalEvent::Closed { graceful: true });
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
            self.tx.subscribe()
        }
    }

    struct FakeTransport {
        create_calls: AtomicU32,
        close_calls: AtomicU32,
        create_delay: Mutex<Duration>,
        exchanged: Mutex<Option<SessionDescription>>,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                create_calls: AtomicU32::new(0),
                close_calls: AtomicU32::new(0),
                create_delay: Mutex::new(Duration::ZERO),
                exchanged: Mutex::new(None),
            })
        }

        fn set_create_delay(&self, d: Duration) {
            *self.create_delay.lock().unwrap() = d;
        }
    }

    #[async_trait]
    impl PeerTransport for FakeTransport {
        async fn create(&self) -> Result<(), TransportError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.create_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }

        async fn describe(&self) -> Result<SessionDescription, TransportError> {
            Ok(SessionDescription::new("offer"))
        }

        async fn exchange(&self, remote: SessionDescription) -> Result<(), TransportError> {
            *self.exchanged.lock().unwrap() = Some(remote);
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakePolicy {
        wants: AtomicBool,
        plan: Mutex<SubscriptionPlan>,
    }

    impl FakePolicy {
        fn new(wants: bool) -> Arc<Self> {
            Arc::new(Self {
                wants: AtomicBool::new(wants),
                plan: Mutex::new(SubscriptionPlan { streams: vec!["remote-1".into()] }),
            })
        }
    }

    impl BandwidthPolicy for FakePolicy {
        fn update_index(&self, index: StreamIndex) {
            *self.plan.lock().unwrap() = SubscriptionPlan { streams: index.streams };
        }

        fn wants_resubscribe(&self) -> bool {
            self.wants.load(Ordering::SeqCst)
        }

        fn choose(&self) -> SubscriptionPlan {
            self.plan.lock().unwrap().clone()
        }
    }

    // ---- helpers ---------------------------------------------------------

    fn test_config(max_attempts: u32) -> SessionConfig {
        SessionConfig {
            reconnect: ReconnectConfig {
                backoff: BackoffPolicy {
                    first: Duration::from_millis(100),
                    max: Duration::from_secs(2),
                    floor: Duration::from_millis(50),
                    factor: 2.0,
                    jitter: JitterPolicy::None,
                },
                max_attempts,
                max_elapsed: Duration::ZERO,
            },
            ..SessionConfig::default()
        }
    }

    fn make_controller(
        signaling: &Arc<FakeSignaling>,
        transport: &Arc<FakeTransport>,
        cfg: SessionConfig,
    ) -> Arc<SessionController> {
        SessionControllerBuilder::new(cfg)
            .with_signaling(Arc::clone(signaling) as Arc<dyn SignalingClient>)
            .with_transport(Arc::clone(transport) as Arc<dyn PeerTransport>)
            .with_bandwidth_policy(FakePolicy::new(true))
            .build()
            .unwrap()
    }

    /// Waits (in virtual time) for the next event of the given kind.
    async fn expect_event(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        tokio::time::timeout(Duration::from_secs(600), async {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.kind == kind => return ev,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{kind:?} was never published"))
    }

    // ---- tests -----------------------------------------------------------

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_establishes_session() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        assert_eq!(ctl.connect(), Transition::Transitioned);
        expect_event(&mut rx, EventKind::Started).await;

        assert_eq!(ctl.state(), SessionState::Connected);
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 1);
        assert!(transport.exchanged.lock().unwrap().is_some());
        assert_eq!(
            signaling.sent_count(|m| matches!(m, SignalMessage::Offer(_))),
            1
        );
        assert_eq!(
            signaling.sent_count(|m| matches!(m, SignalMessage::Subscribe(_))),
            1
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connect_while_connecting_is_rejected() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        transport.set_create_delay(Duration::from_secs(2));
        let ctl = make_controller(&signaling, &transport, test_config(2));

        assert_eq!(ctl.connect(), Transition::Transitioned);
        assert_eq!(ctl.connect(), Transition::NoTransition);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_failed_connect_retries_and_recovers() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        signaling.fail_next_opens(1);
        let ctl = make_controller(&signaling, &transport, test_config(3));
        let mut rx = ctl.events();

        ctl.connect();
        let scheduled = expect_event(&mut rx, EventKind::ReconnectScheduled).await;
        assert_eq!(scheduled.delay_ms, Some(100));
        assert_eq!(scheduled.reason.as_deref(), Some("task_failed"));

        expect_event(&mut rx, EventKind::Started).await;
        assert_eq!(ctl.state(), SessionState::Connected);
        assert_eq!(signaling.open_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_exhausted_retries_report_exactly_one_stop() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        signaling.fail_next_opens(u32::MAX);
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::ReconnectGaveUp).await;
        let stopped = expect_event(&mut rx, EventKind::Stopped).await;
        assert!(matches!(stopped.status, Some(SessionStatus::Failed { .. })));
        assert_eq!(ctl.state(), SessionState::NotConnected);

        // no further Stopped event follows
        tokio::time::sleep(Duration::from_secs(30)).await;
        let mut extra_stops = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::Stopped {
                extra_stops += 1;
            }
        }
        assert_eq!(extra_stops, 0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_while_connecting_defers_and_never_overlaps() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        transport.set_create_delay(Duration::from_secs(2));
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        assert_eq!(ctl.connect(), Transition::Transitioned);
        tokio::task::yield_now().await;
        assert_eq!(ctl.state(), SessionState::Connecting);

        // queued behind the in-flight connect, not run concurrently with it
        assert_eq!(ctl.disconnect(), Transition::Deferred);
        assert_eq!(ctl.state(), SessionState::Connecting);

        let started = expect_event(&mut rx, EventKind::Started).await;
        let stopped = expect_event(&mut rx, EventKind::Stopped).await;
        assert!(started.seq < stopped.seq);
        assert_eq!(stopped.status, Some(SessionStatus::Left));
        assert_eq!(ctl.state(), SessionState::NotConnected);
        assert!(transport.close_calls.load(Ordering::SeqCst) >= 1);
        assert!(!signaling.is_open());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_update_while_updating_replays_exactly_once() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        signaling.set_subscribe_ack_delay(Duration::from_millis(500));
        assert_eq!(ctl.update(), Transition::Transitioned);
        assert_eq!(ctl.update(), Transition::Deferred);
        assert_eq!(ctl.update(), Transition::Deferred); // last-wins, still one slot

        expect_event(&mut rx, EventKind::Updated).await;
        expect_event(&mut rx, EventKind::Updated).await;
        assert_eq!(ctl.state(), SessionState::Connected);

        // one subscribe for connect, one per executed update
        assert_eq!(
            signaling.sent_count(|m| matches!(m, SignalMessage::Subscribe(_))),
            3
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_connection_loss_reconnects_in_place() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(3));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        signaling.drop_connection();
        expect_event(&mut rx, EventKind::ConnectionBecamePoor).await;
        expect_event(&mut rx, EventKind::Started).await;

        assert_eq!(ctl.state(), SessionState::Connected);
        assert_eq!(signaling.open_calls.load(Ordering::SeqCst), 2);
        // the stale transport was torn down before the new attempt
        assert!(transport.close_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_remote_graceful_close_tears_down() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(3));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        signaling.open.store(false, Ordering::SeqCst);
        let _ = signaling.tx.send(SignalEvent::Closed { graceful: true });

        let stopped = expect_event(&mut rx, EventKind::Stopped).await;
        assert_eq!(stopped.status, Some(SessionStatus::Left));
        assert_eq!(ctl.state(), SessionState::NotConnected);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_while_idle_is_silently_ignored() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        assert_eq!(ctl.disconnect(), Transition::NoTransition);
        assert_eq!(ctl.update(), Transition::NoTransition);
        assert_eq!(ctl.state(), SessionState::NotConnected);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_disconnect_cancels_pending_retry() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        signaling.fail_next_opens(u32::MAX);
        let ctl = make_controller(&signaling, &transport, test_config(5));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::ReconnectScheduled).await;
        // let the failure tail settle into NotConnected with a pending timer
        tokio::task::yield_now().await;

        assert_eq!(ctl.disconnect(), Transition::NoTransition);
        let stopped = expect_event(&mut rx, EventKind::Stopped).await;
        assert_eq!(stopped.status, Some(SessionStatus::Left));

        let opens_at_stop = signaling.open_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        // the canceled timer never fired another attempt
        assert_eq!(signaling.open_calls.load(Ordering::SeqCst), opens_at_stop);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_phase_timeout_is_categorized_as_timed_out() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        // slower than media_setup_timeout (5s); every attempt times out
        transport.set_create_delay(Duration::from_secs(10));
        let ctl = make_controller(&signaling, &transport, test_config(1));
        let mut rx = ctl.events();

        ctl.connect();
        let scheduled = expect_event(&mut rx, EventKind::ReconnectScheduled).await;
        assert_eq!(scheduled.reason.as_deref(), Some("task_timeout"));

        let stopped = expect_event(&mut rx, EventKind::Stopped).await;
        assert_eq!(stopped.status, Some(SessionStatus::TimedOut));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_index_update_drives_resubscribe() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(2));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        let _ = signaling.tx.send(SignalEvent::Message(SignalMessage::IndexUpdate(
            StreamIndex { streams: vec!["remote-2".into()] },
        )));
        expect_event(&mut rx, EventKind::Updated).await;

        let plans: Vec<SubscriptionPlan> = signaling
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                SignalMessage::Subscribe(plan) => Some(plan.clone()),
                _ => None,
            })
            .collect();
        // one subscribe during connect, one for the index-driven update
        assert_eq!(plans.len(), 2);
        assert_eq!(plans.last().unwrap().streams, vec!["remote-2".to_string()]);
        assert_eq!(ctl.state(), SessionState::Connected);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_recv_media_disabled_skips_subscribe_phase() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let mut cfg = test_config(2);
        cfg.capabilities.recv_media = false;
        let ctl = make_controller(&signaling, &transport, cfg);
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        assert_eq!(ctl.state(), SessionState::Connected);
        assert_eq!(
            signaling.sent_count(|m| matches!(m, SignalMessage::Subscribe(_))),
            0
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_auto_resubscribe_disabled_ignores_index_updates() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let mut cfg = test_config(2);
        cfg.capabilities.auto_resubscribe = false;
        let ctl = make_controller(&signaling, &transport, cfg);
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;

        let _ = signaling.tx.send(SignalEvent::Message(SignalMessage::IndexUpdate(
            StreamIndex { streams: vec!["remote-2".into()] },
        )));
        tokio::time::sleep(Duration::from_secs(1)).await;

        // only the connect-time subscribe went out
        assert_eq!(
            signaling.sent_count(|m| matches!(m, SignalMessage::Subscribe(_))),
            1
        );
        assert_eq!(ctl.state(), SessionState::Connected);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_reconnect_reuses_open_signaling_channel() {
        let signaling = FakeSignaling::new();
        let transport = FakeTransport::new();
        let ctl = make_controller(&signaling, &transport, test_config(3));
        let mut rx = ctl.events();

        ctl.connect();
        expect_event(&mut rx, EventKind::Started).await;
        assert_eq!(signaling.open_calls.load(Ordering::SeqCst), 1);

        // app-requested reconnect with the channel still open
        assert_eq!(ctl.reconnect(), Transition::Transitioned);
        expect_event(&mut rx, EventKind::Started).await;

        assert_eq!(ctl.state(), SessionState::Connected);
        // the once-wrapped open task was reused, no second open
        assert_eq!(signaling.open_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 2);
    }
}
