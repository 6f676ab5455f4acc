//! # Event subscribers for the task registry.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`], for handling events broadcast through the [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! TaskRegistry ── publish(Event) ──► Bus ──► registry listener ──► SubscriberSet
//!                                                                     │
//!                                                          ┌──────────┼──────────┐
//!                                                          ▼          ▼          ▼
//!                                                      LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use taskgraph::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct EvictionCounter;
//!
//! #[async_trait]
//! impl Subscribe for EvictionCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskEvicted {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "eviction-counter" }
//! }
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
