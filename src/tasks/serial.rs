//! # Serial task group.
//!
//! [`SerialGroup`] runs its children strictly in declaration order, one at a
//! time. Side effects of child *N* are fully applied before child *N+1*
//! starts.
//!
//! ## Abort semantics
//! The first failure or cancellation stops the iteration: children after the
//! failing one are **never started** (they do not need an explicit cancel,
//! they never ran), and the group settles with the failing child's cause
//! unchanged.

use async_trait::async_trait;
use std::borrow::Cow;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::{Task, TaskRef};

/// Ordered sequence of sub-tasks; only one runs at a time.
pub struct SerialGroup {
    name: Cow<'static, str>,
    children: Vec<TaskRef>,
}

impl SerialGroup {
    /// Creates a serial group from the given children, run in order.
    pub fn new(name: impl Into<Cow<'static, str>>, children: Vec<TaskRef>) -> Self {
        Self { name: name.into(), children }
    }
}

#[async_trait]
impl Task for SerialGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        for child in &self.children {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            child.run(ctx.child_token()).await?;
        }
        Ok(())
    }
}
