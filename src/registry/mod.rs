//! # Task registry with tombstoned history.
//!
//! [`TaskRegistry`] tracks live tasks (optionally under a caller-supplied identifier)
//! and keeps the terminal statuses of finished ones per identifier.
//!
//! ```text
//! track(task, "sync")                         task reaches a terminal status
//!     │                                                   │
//!     ▼                                                   ▼
//! ┌─────────────── registry lock ───────────────────────────────────────┐
//! │ live:          id ──► LiveEntry { task, identifier, status }         │
//! │ by_identifier: "sync" ──► [id₁, id₂]   (last = forward index)        │
//! │ history:       "sync" ──► [Snapshot, Snapshot, ...] (oldest first)   │
//! │ finished:      id ──► "sync"           (for resolve)                 │
//! └───────────────┬──────────────────────────────────────────────────────┘
//!                 ▼
//!         Bus::publish(Event) ──► listener ──► SubscriberSet ──► workers
//! ```
//!
//! ## Rules
//! - A task is live from `track` until the registry observes its terminal status;
//!   then it leaves the live set and its status is appended to the identifier's history.
//! - `lookup` only sees live tasks; `last_status` only sees history.
//! - An identifier whose tasks have all finished stays visible as a tombstone.
//! - Anonymous tasks are live-only: nothing is recorded when they finish.
//! - Every map mutation publishes exactly one event while the lock is held, so
//!   event order matches mutation order.
//! - Lock order is task, then registry. The registry never calls into a task while
//!   holding its own lock.
//! - The registry holds tasks strongly; tasks hold the registry weakly through their
//!   observer, so dropping every registry handle never blocks a task.

mod builder;
mod element;
mod tables;
mod task_registry;

pub use builder::RegistryBuilder;
pub use element::{RegistryElement, Resolved, StatusSnapshot};
pub use task_registry::TaskRegistry;
