//! Synchronization primitives the task model is built on.
//!
//! ## Contents
//! - [`Lock`]          blocking mutex with explicit acquire/relinquish (thread context)
//! - [`Locked`]        value wrapper exposing `get`/`set`/`mutate` under a [`Lock`]
//! - [`Semaphore`]     counting semaphore with FIFO cooperative suspension (async context)
//! - [`AsyncPromise`]  single-assignment future, awaitable by many readers
//!
//! `Lock` parks threads; `Semaphore::wait` and `AsyncPromise::get` suspend futures.
//! They are different tools for different execution contexts.

mod lock;
mod locked;
mod promise;
mod semaphore;

pub use lock::Lock;
pub use locked::Locked;
pub use promise::AsyncPromise;
pub use semaphore::{Semaphore, SemaphoreGuard};
