//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom event handlers into a registry.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                    └─► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only** and publishes
//!   `EventKind::SubscriberOverflow`; other subscribers are unaffected.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers do not block publishers or each other.
//!
//! ## Overflow behavior
//! 1) The new event is **dropped** for this subscriber only.
//! 2) The set publishes `EventKind::SubscriberOverflow`.
//! 3) Other subscribers are unaffected.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use taskgraph::{Subscribe, Event, EventKind, StatusKind};
//!
//! struct FailureAlerts;
//!
//! #[async_trait]
//! impl Subscribe for FailureAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskEvicted && ev.status == Some(StatusKind::Error) {
//!             // page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "alerts" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for registry observability.
///
/// Runs on its own worker task behind a bounded queue, so a slow or panicking
/// subscriber never blocks the registry or other subscribers. Avoid blocking the
/// executor inside [`on_event`](Self::on_event).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    ///
    /// Panics are caught; the set publishes `EventKind::SubscriberPanicked`.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Filters events before they are queued. Rejected events take no queue slot
    /// and never count as overflow.
    ///
    /// Default: accept everything.
    fn accepts(&self, event: &Event) -> bool {
        let _ = event;
        true
    }
}
