//! # Once barrier wrapper.
//!
//! [`OnceTask`] wraps exactly one inner task plus zero or more dependency
//! tasks and guarantees that the inner task's work executes **at most once**
//! no matter how many callers race on [`run`](crate::Task::run). Every caller
//! observes the identical settled outcome.
//!
//! ## Execution
//! The first `run` triggers all dependencies concurrently, then the inner
//! task; the outcome is cached as a shared future. A detached driver keeps
//! the execution going even if the caller that started it is canceled, so a
//! later caller can never re-trigger the work.
//!
//! ## Cancellation order
//! Canceling the wrapper reaches the dependencies first (reverse declaration
//! order), then the inner task on the next scheduling opportunity. A
//! dependency's own cancellation or failure is discovered deeper in the chain
//! and therefore wins the race to any outstanding waiter.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use std::borrow::Cow;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{Task, TaskRef};

type SharedOutcome = Shared<BoxFuture<'static, Result<(), TaskError>>>;

/// Cancels the shared execution: dependencies immediately (reverse order),
/// the inner task on the next scheduling opportunity.
fn cancel_execution(dep_tokens: &[CancellationToken], inner_token: &CancellationToken) {
    for token in dep_tokens.iter().rev() {
        token.cancel();
    }
    let inner = inner_token.clone();
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::task::yield_now().await;
                inner.cancel();
            });
        }
        // no scheduler to defer on
        Err(_) => inner.cancel(),
    }
}

/// Propagates a caller's cancellation even when the caller's `run` future is
/// abandoned without being polled again (a timeout decorator drops it right
/// after canceling its token).
struct AbandonGuard {
    ctx: CancellationToken,
    dep_tokens: Vec<CancellationToken>,
    inner_token: CancellationToken,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed && self.ctx.is_cancelled() {
            cancel_execution(&self.dep_tokens, &self.inner_token);
        }
    }
}

/// At-most-once execution barrier around an inner task and its dependencies.
pub struct OnceTask {
    name: Cow<'static, str>,
    inner: TaskRef,
    deps: Vec<TaskRef>,
    dep_tokens: Vec<CancellationToken>,
    inner_token: CancellationToken,
    slot: Mutex<Option<SharedOutcome>>,
}

impl OnceTask {
    /// Creates a barrier around `inner`, gated on `deps` completing first.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        inner: TaskRef,
        deps: Vec<TaskRef>,
    ) -> Self {
        let dep_tokens = deps.iter().map(|_| CancellationToken::new()).collect();
        Self {
            name: name.into(),
            inner,
            deps,
            dep_tokens,
            inner_token: CancellationToken::new(),
            slot: Mutex::new(None),
        }
    }

    /// Requests cancellation of the shared execution.
    ///
    /// Dependencies are canceled immediately (reverse declaration order); the
    /// inner task is canceled on the next scheduling opportunity, so a
    /// dependency's own cause reaches waiters first. Idempotent; safe to call
    /// before the first `run`, which then prevents the work from ever
    /// starting.
    pub fn cancel(&self) {
        cancel_execution(&self.dep_tokens, &self.inner_token);
    }

    /// Returns the cached outcome once the shared execution has settled,
    /// `None` while it has not started or is still running.
    pub fn settled(&self) -> Option<Result<(), TaskError>> {
        self.slot.lock().unwrap().as_ref().and_then(|f| f.peek().cloned())
    }

    /// Builds the single shared execution: dependencies first, then inner.
    fn exec(&self) -> BoxFuture<'static, Result<(), TaskError>> {
        let deps = self.deps.clone();
        let dep_tokens = self.dep_tokens.clone();
        let inner = self.inner.clone();
        let inner_token = self.inner_token.clone();

        async move {
            if !deps.is_empty() {
                let mut pending: FuturesUnordered<_> = deps
                    .iter()
                    .zip(&dep_tokens)
                    .map(|(dep, token)| dep.run(token.clone()))
                    .collect();

                let mut first: Option<TaskError> = None;
                while let Some(res) = pending.next().await {
                    if let Err(cause) = res {
                        if first.is_none() {
                            for token in dep_tokens.iter().rev() {
                                token.cancel();
                            }
                            first = Some(cause);
                        }
                    }
                }
                if let Some(cause) = first {
                    return Err(cause);
                }
            }

            if inner_token.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            inner.run(inner_token.child_token()).await
        }
        .boxed()
    }
}

#[async_trait]
impl Task for OnceTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let shared = {
            let mut slot = self.slot.lock().unwrap();
            match slot.as_ref() {
                Some(f) => f.clone(),
                None => {
                    let f = self.exec().shared();
                    // detached driver: a canceled caller must not stall the
                    // shared execution for the callers still waiting on it
                    tokio::spawn(f.clone().map(|_| ()));
                    *slot = Some(f.clone());
                    f
                }
            }
        };

        let mut guard = AbandonGuard {
            ctx: ctx.clone(),
            dep_tokens: self.dep_tokens.clone(),
            inner_token: self.inner_token.clone(),
            armed: true,
        };
        tokio::select! {
            res = shared.clone() => {
                guard.armed = false;
                res
            }
            _ = ctx.cancelled() => {
                guard.armed = false;
                self.cancel();
                // surface whatever cause the shared execution settles with
                shared.await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::task_fn::TaskFn;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn slow_counting(name: &'static str, count: Arc<AtomicUsize>) -> TaskRef {
        TaskFn::arc(name, move |ctx| {
            let count = count.clone();
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                    _ = ctx.cancelled() => Err(TaskError::Canceled),
                }
            }
        })
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_concurrent_runs_execute_inner_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let once = Arc::new(OnceTask::new(
            "barrier",
            slow_counting("inner", count.clone()),
            Vec::new(),
        ));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let once = once.clone();
            handles.push(tokio::spawn(async move {
                once.run(CancellationToken::new()).await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(()));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(once.settled(), Some(Ok(())));

        // a later run re-returns the cached outcome without new work
        once.run(CancellationToken::new()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failure_outcome_is_shared() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts2 = attempts.clone();
        let once = OnceTask::new(
            "barrier",
            TaskFn::arc("flaky", move |_| {
                let attempts = attempts2.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(TaskError::Fail { error: "boom".into() })
                }
            }),
            Vec::new(),
        );

        let first = once.run(CancellationToken::new()).await.unwrap_err();
        let second = once.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(first, TaskError::Fail { error: "boom".into() });
        assert_eq!(first, second);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_dependencies_run_before_inner() {
        let dep_done = Arc::new(AtomicUsize::new(0));
        let dep_done2 = dep_done.clone();
        let inner_saw_dep = Arc::new(AtomicUsize::new(0));
        let inner_saw = inner_saw_dep.clone();
        let dep_probe = dep_done.clone();

        let once = OnceTask::new(
            "barrier",
            TaskFn::arc("inner", move |_| {
                let saw = inner_saw.clone();
                let dep = dep_probe.clone();
                async move {
                    saw.store(dep.load(Ordering::SeqCst), Ordering::SeqCst);
                    Ok(())
                }
            }),
            vec![slow_counting("dep", dep_done2)],
        );

        once.run(CancellationToken::new()).await.unwrap();
        assert_eq!(dep_done.load(Ordering::SeqCst), 1);
        assert_eq!(inner_saw_dep.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_cancel_during_dep_phase_surfaces_dep_cause_and_skips_inner() {
        let inner_ran = Arc::new(AtomicUsize::new(0));
        let inner_ran2 = inner_ran.clone();

        let stuck_dep = TaskFn::arc("stuck-dep", |ctx| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let once = Arc::new(OnceTask::new(
            "barrier",
            TaskFn::arc("inner", move |_| {
                let inner_ran = inner_ran2.clone();
                async move {
                    inner_ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            vec![stuck_dep],
        ));

        let caller = CancellationToken::new();
        let runner = {
            let once = once.clone();
            let caller = caller.clone();
            tokio::spawn(async move { once.run(caller).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.cancel();

        // the dependency's own cancellation is the cause waiters observe
        assert_eq!(runner.await.unwrap(), Err(TaskError::Canceled));
        assert_eq!(inner_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_cancel_before_first_run_prevents_execution() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let once = OnceTask::new(
            "barrier",
            TaskFn::arc("inner", move |_| {
                let ran = ran2.clone();
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            Vec::new(),
        );

        once.cancel();
        // let the deferred inner-token cancellation land
        tokio::time::sleep(Duration::from_millis(5)).await;
        let err = once.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, TaskError::Canceled);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
