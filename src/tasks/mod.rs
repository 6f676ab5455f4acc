//! # Tasks and their state machine.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait for observable, cancelable units of work
//! - [`OperationTask`] - function-backed task (closure receiving a [`TaskContext`])
//! - [`TaskStatus`] / [`StatusKind`] - status model and transition table
//! - [`StatusCell`] - serialized state machine reusable by custom tasks
//! - [`StatusStream`] - ordered status stream ending after a terminal status
//! - [`AnyTask`] - type-erased handle stored by the registry

mod context;
mod erased;
mod id;
mod operation;
mod state;
mod status;
mod stream;
mod task;

pub use context::{TaskContext, Values};
pub use erased::{AnyError, AnyStatus, AnyStatusStream, AnyTask, AnyValue};
pub use id::TaskId;
pub use operation::{OperationTask, OperationTaskBuilder};
pub use state::{ObserverId, StatusCell, StatusObserver, Trigger};
pub use status::{Progress, StatusKind, TaskStatus};
pub use stream::StatusStream;
pub use task::Task;
