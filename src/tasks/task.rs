//! # Task abstraction.
//!
//! This module defines the [`Task`] trait: a named, cancelable unit of
//! asynchronous work. The common handle type is [`TaskRef`], an
//! `Arc<dyn Task>` suitable for sharing across task graphs.
//!
//! A task receives a [`CancellationToken`] and should check it before and
//! after every suspension point, returning [`TaskError::Canceled`] promptly
//! when it fires. Cancellation is idempotent: canceling the token of a task
//! that never ran prevents it from doing any work, and canceling an already
//! settled task has no effect.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a task (`Arc<dyn Task>`).
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// A `Task` has a stable [`name`](Task::name) for diagnostics and an async
/// [`run`](Task::run) method that receives a [`CancellationToken`]. Groups
/// derive one child token per sub-task from the token they were given, so
/// canceling a composite reaches exactly the children that are still
/// eligible to run.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use meetvisor::{Task, TaskError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Task for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the task until completion or cancellation.
    ///
    /// Implementations must return [`TaskError::Canceled`] promptly once
    /// `ctx` fires; suspended work must not leak timers, observers, or
    /// channel subscriptions when it is abandoned.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
