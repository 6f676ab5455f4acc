//! Registry events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to changes of a [`TaskRegistry`](crate::TaskRegistry).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskRegistry` (one event per map mutation, plus cancel requests),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the registry listener (fans out to `SubscriberSet`) and any
//!   receiver from [`TaskRegistry::subscribe`](crate::TaskRegistry::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
