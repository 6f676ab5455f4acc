//! # taskgraph
//!
//! **taskgraph** is a task lifecycle and observability core for async Rust.
//!
//! It provides observable, cancelable tasks driven by a strict state machine,
//! a concurrent registry that tracks them (with per-identifier history kept after
//! they finish), and the synchronization primitives the rest is built on.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────────┐  ┌────────────────┐  ┌────────────────┐
//!   │ OperationTask  │  │ OperationTask  │  │  custom Task   │
//!   │ (closure + ctx)│  │ (closure + ctx)│  │  (StatusCell)  │
//!   └───────┬────────┘  └───────┬────────┘  └───────┬────────┘
//!           │ AnyTask           │ AnyTask           │ AnyTask
//!           ▼                   ▼                   ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  TaskRegistry                                                │
//! │  - live set + forward index (identifier → newest live task)  │
//! │  - history (identifier → terminal snapshots, tombstones)     │
//! │  - observes every tracked task's status                      │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ one Event per map mutation
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Bus (tokio broadcast channel)                │
//! └───────────┬──────────────────────────────────┬───────────────┘
//!             ▼                                  ▼
//!     registry.subscribe()               listener ─► SubscriberSet
//!     (raw receiver)                           ┌────────┼────────┐
//!                                              ▼        ▼        ▼
//!                                          LogWriter  sub2     subN
//! ```
//!
//! ### Lifecycle
//! ```text
//!            start()            pause()
//!   Idle ──────────────► Active ◄──────► Paused
//!    │                   │  │  resume()    │
//!    │ cancel()          │  │ op Ok/Err    │ cancel()
//!    ▼                   │  ▼              ▼
//! Canceled ◄─────────────┘ Success(T) / Error(E)     Canceled
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                              |
//! |-------------------|-----------------------------------------------------------------|-------------------------------------------------|
//! | **Tasks**         | Observable state machine, function-backed tasks, type erasure.  | [`Task`], [`OperationTask`], [`AnyTask`]        |
//! | **Registry**      | Live tracking, lookup, cancellation, tombstoned history.        | [`TaskRegistry`], [`RegistryElement`]           |
//! | **Subscriber API**| Hook into registry events (logging, metrics, custom sinks).     | [`Subscribe`], [`LogWriter`]                    |
//! | **Policies**      | Retry loops with pluggable backoff and jitter.                  | [`RetryPolicy`], [`BackoffStrategy`]            |
//! | **Sync**          | Blocking lock, FIFO async semaphore, single-assignment promise. | [`Lock`], [`Semaphore`], [`AsyncPromise`]       |
//! | **Errors**        | Typed errors with stable labels.                                | [`TaskError`], [`SyncError`], [`RetryError`]    |
//! | **Configuration** | Registry and retry defaults.                                    | [`Config`]                                      |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskgraph::{
//!     Config, LogWriter, OperationTask, Progress, StatusKind, TaskContext, TaskError, TaskRegistry,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), TaskError> {
//!     let registry = TaskRegistry::builder(Config::default())
//!         .with_subscriber(LogWriter::new())
//!         .build();
//!
//!     let import = OperationTask::builder(|ctx: TaskContext| async move {
//!         for step in 1..=3 {
//!             ctx.checkpoint().await?;
//!             tokio::time::sleep(Duration::from_millis(1)).await;
//!             ctx.report_progress(Progress::of(step, 3));
//!         }
//!         Ok::<_, TaskError>(3u64)
//!     })
//!     .timeout(Duration::from_secs(5))
//!     .build();
//!
//!     registry.run(import.clone(), Some("import"));
//!     let done = import.join().await;
//!
//!     assert_eq!(done.success(), Some(&3));
//!     assert!(registry.lookup("import").is_none());
//!     assert_eq!(
//!         registry.last_status("import").map(|s| s.kind()),
//!         Some(StatusKind::Success)
//!     );
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod policies;
mod registry;
mod subscribers;
mod sync;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{Canceled, RetryError, SyncError, TaskError, TransitionError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Backoff, BackoffStrategy, JitterPolicy, RetryPolicy};
pub use registry::{RegistryBuilder, RegistryElement, Resolved, StatusSnapshot, TaskRegistry};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use sync::{AsyncPromise, Lock, Locked, Semaphore, SemaphoreGuard};
pub use tasks::{
    AnyError, AnyStatus, AnyStatusStream, AnyTask, AnyValue, ObserverId, OperationTask,
    OperationTaskBuilder, Progress, StatusCell, StatusKind, StatusObserver, StatusStream, Task,
    TaskContext, TaskId, TaskStatus, Trigger, Values,
};
