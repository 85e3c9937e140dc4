//! # Timeout decorator.
//!
//! [`TimeoutTask`] races one wrapped task against a deadline. Whichever
//! settles first wins:
//!
//! - inner task settles first: its outcome passes through **unchanged** and
//!   the timer is dropped with no side effects;
//! - the deadline fires first: the inner task's token is canceled and the
//!   decorator fails with [`TaskError::Timeout`].
//!
//! The decorator is the only place in the task model that substitutes a
//! cause, and it does so only when its own deadline triggered the abort.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{Task, TaskRef};

/// Deadline wrapper around a single task.
pub struct TimeoutTask {
    name: String,
    inner: TaskRef,
    timeout: Duration,
}

impl TimeoutTask {
    /// Wraps `inner` with the given deadline.
    pub fn new(inner: TaskRef, timeout: Duration) -> Self {
        Self {
            name: format!("{}[{:?}]", inner.name(), timeout),
            inner,
            timeout,
        }
    }
}

#[async_trait]
impl Task for TimeoutTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let child = ctx.child_token();
        match time::timeout(self.timeout, self.inner.run(child.clone())).await {
            Ok(res) => res,
            Err(_elapsed) => {
                child.cancel();
                Err(TaskError::Timeout { timeout: self.timeout })
            }
        }
    }
}
