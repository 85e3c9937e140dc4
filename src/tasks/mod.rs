//! # Task abstractions and composites.
//!
//! This module provides the execution model the orchestrator builds its
//! connect/update/disconnect graphs from:
//! - [`Task`] - trait for implementing async cancelable tasks
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`SerialGroup`] - children in order, abort on first failure
//! - [`ParallelGroup`] - children concurrently, first failure cancels siblings
//! - [`TimeoutTask`] - races a task against a deadline
//! - [`OnceTask`] - at-most-once barrier with dependency gating
//!
//! Composites are themselves tasks and nest to arbitrary depth. Cancellation
//! travels through [`tokio_util::sync::CancellationToken`] hierarchies: a
//! composite derives one child token per sub-task, so canceling it reaches
//! exactly the children still eligible to run.

mod once;
mod parallel;
mod serial;
mod task;
mod task_fn;
mod timeout;

pub use once::OnceTask;
pub use parallel::ParallelGroup;
pub use serial::SerialGroup;
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
pub use timeout::TimeoutTask;
