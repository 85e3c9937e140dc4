//! # Parallel task group.
//!
//! [`ParallelGroup`] starts all children concurrently and completes when all
//! of them succeed. No ordering is guaranteed among siblings.
//!
//! ## Abort semantics
//! The first observed failure or cancellation requests cancellation of every
//! still-running sibling (each child runs under its own child token), then
//! the group waits for all siblings to settle and propagates the **original**
//! cause upward. Cancellation errors produced by the unwound siblings are
//! absorbed; they are a consequence, not the cause.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::borrow::Cow;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{Task, TaskRef};

/// Concurrently running group of sub-tasks.
pub struct ParallelGroup {
    name: Cow<'static, str>,
    children: Vec<TaskRef>,
}

impl ParallelGroup {
    /// Creates a parallel group from the given children.
    pub fn new(name: impl Into<Cow<'static, str>>, children: Vec<TaskRef>) -> Self {
        Self { name: name.into(), children }
    }
}

#[async_trait]
impl Task for ParallelGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }

        let tokens: Vec<CancellationToken> =
            self.children.iter().map(|_| ctx.child_token()).collect();

        let mut pending: FuturesUnordered<_> = self
            .children
            .iter()
            .zip(&tokens)
            .map(|(child, token)| child.run(token.clone()))
            .collect();

        // Drain all siblings; cancellation of the rest is requested on the
        // first failure, before the group settles.
        let mut first: Option<TaskError> = None;
        while let Some(res) = pending.next().await {
            if let Err(cause) = res {
                if first.is_none() {
                    for token in &tokens {
                        token.cancel();
                    }
                    first = Some(cause);
                }
            }
        }

        match first {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }
}
