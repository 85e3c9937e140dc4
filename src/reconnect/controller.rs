//! # Reconnect controller.
//!
//! Decides, after a session failure, whether another connection attempt
//! should be made and when. Pacing comes from [`BackoffPolicy`]; eligibility
//! from an attempt budget and an elapsed-time budget measured from the first
//! failure of the current window.
//!
//! ## Rules
//! - A scheduled retry is cancelable; a canceled retry never invokes
//!   `on_retry` and does not consume an attempt (attempts are counted when
//!   the timer actually fires).
//! - [`ReconnectController::cancel`] is synchronous and has no callback side
//!   effects.
//! - [`ReconnectController::disable`] makes every later decision negative
//!   until [`ReconnectController::reset`] (graceful leave).
//! - [`ReconnectController::reset`] starts a fresh budget window (fresh,
//!   non-reconnecting connect).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::policies::BackoffPolicy;

/// Budget configuration for reconnect decisions.
///
/// ## Sentinel values
/// - `max_attempts = 0` → no attempt limit
/// - `max_elapsed = 0s` → no elapsed-time limit
#[derive(Clone, Copy, Debug)]
pub struct ReconnectConfig {
    /// Delay pacing across consecutive failures.
    pub backoff: BackoffPolicy,
    /// Maximum number of retry attempts per window (`0` = unlimited).
    pub max_attempts: u32,
    /// Maximum time since the window opened (`0s` = unlimited).
    pub max_elapsed: Duration,
}

impl Default for ReconnectConfig {
    /// Returns a config with 8 attempts inside a 2 minute window and default
    /// backoff pacing.
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            max_attempts: 8,
            max_elapsed: Duration::from_secs(120),
        }
    }
}

struct Inner {
    enabled: bool,
    attempts: u32,
    window_started: Option<Instant>,
    pending: Option<CancellationToken>,
}

/// Retry eligibility and pacing after session failures.
pub struct ReconnectController {
    cfg: ReconnectConfig,
    inner: Arc<Mutex<Inner>>,
}

impl ReconnectController {
    /// Creates an enabled controller with a fresh budget window.
    pub fn new(cfg: ReconnectConfig) -> Self {
        Self {
            cfg,
            inner: Arc::new(Mutex::new(Inner {
                enabled: true,
                attempts: 0,
                window_started: None,
                pending: None,
            })),
        }
    }

    /// Number of retries consumed in the current window.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().unwrap().attempts
    }

    /// Whether a retry timer is currently pending.
    pub fn is_retry_pending(&self) -> bool {
        self.inner.lock().unwrap().pending.is_some()
    }

    /// Clears attempt counters, restarts the budget window, re-enables
    /// retries, and drops any pending timer.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(token) = inner.pending.take() {
            token.cancel();
        }
        inner.enabled = true;
        inner.attempts = 0;
        inner.window_started = None;
    }

    /// Makes all future retry decisions negative until [`reset`](Self::reset).
    pub fn disable(&self) {
        self.inner.lock().unwrap().enabled = false;
    }

    /// Cancels the pending retry timer, if any. Returns whether one existed.
    ///
    /// Synchronous and side-effect-free: `on_retry` is not invoked and no
    /// attempt is consumed.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.pending.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Decides whether to retry after a failure.
    ///
    /// Positive decision: returns `Some(delay)` and schedules `on_retry` to
    /// run after the jittered backoff delay on a cancelable timer. Negative
    /// decision (disabled, or attempt/elapsed budget exhausted): invokes
    /// `on_give_up` before returning `None`.
    pub fn retry_with_backoff<R, G>(&self, on_retry: R, on_give_up: G) -> Option<Duration>
    where
        R: FnOnce() + Send + 'static,
        G: FnOnce() + Send + 'static,
    {
        let scheduled = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.enabled {
                None
            } else {
                let started = *inner.window_started.get_or_insert_with(Instant::now);
                let attempts_spent =
                    self.cfg.max_attempts > 0 && inner.attempts >= self.cfg.max_attempts;
                let window_spent = self.cfg.max_elapsed > Duration::ZERO
                    && started.elapsed() >= self.cfg.max_elapsed;
                if attempts_spent || window_spent {
                    None
                } else {
                    let delay = self.cfg.backoff.next(inner.attempts);
                    if let Some(stale) = inner.pending.take() {
                        stale.cancel();
                    }
                    let token = CancellationToken::new();
                    inner.pending = Some(token.clone());
                    Some((delay, token))
                }
            }
        };

        match scheduled {
            None => {
                on_give_up();
                None
            }
            Some((delay, token)) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            {
                                let mut guard = inner.lock().unwrap();
                                if token.is_cancelled() {
                                    return;
                                }
                                // the attempt is consumed only when the timer fires
                                guard.attempts += 1;
                                guard.pending = None;
                            }
                            on_retry();
                        }
                        _ = token.cancelled() => {}
                    }
                });
                Some(delay)
            }
        }
    }
}
