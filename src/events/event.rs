//! # Events emitted by the task registry.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Registry events**: one per serialized mutation of the registry maps
//!   (tracked, status changed, evicted) plus cancel requests
//! - **Subscriber events**: delivery problems of user subscribers (overflow, panic)
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! identifier, status kind and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events about one task are published in the order its transitions happened.
//!
//! ## Example
//! ```rust
//! use taskgraph::{Event, EventKind, StatusKind, TaskId};
//!
//! let id = TaskId::next();
//! let ev = Event::new(EventKind::TaskEvicted)
//!     .with_task(id)
//!     .with_identifier("sync-users")
//!     .with_status(StatusKind::Error)
//!     .with_reason("connection reset");
//!
//! assert_eq!(ev.task, Some(id));
//! assert_eq!(ev.identifier.as_deref(), Some("sync-users"));
//! assert_eq!(ev.status, Some(StatusKind::Error));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::tasks::{StatusKind, TaskId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of registry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A task entered the live set.
    ///
    /// Sets:
    /// - `task`: task id
    /// - `identifier`: caller-supplied identifier, if any
    /// - `status`: status at registration
    TaskTracked,

    /// A live task moved to another non-terminal status.
    ///
    /// Sets:
    /// - `task`, `identifier`
    /// - `status`: the new status
    StatusChanged,

    /// A task reached a terminal status and moved from the live set into history.
    ///
    /// Sets:
    /// - `task`, `identifier`
    /// - `status`: the terminal status
    /// - `reason`: error message (only for `Error`)
    TaskEvicted,

    /// Cancellation was forwarded to a live task.
    ///
    /// Sets:
    /// - `task`, `identifier`
    CancelRequested,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::TaskTracked => "task_tracked",
            EventKind::StatusChanged => "status_changed",
            EventKind::TaskEvicted => "task_evicted",
            EventKind::CancelRequested => "cancel_requested",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Registry event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task the event is about.
    pub task: Option<TaskId>,
    /// Caller-supplied identifier of that task.
    pub identifier: Option<Arc<str>>,
    /// Status kind carried by the event.
    pub status: Option<StatusKind>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Subscriber name (subscriber events only).
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            identifier: None,
            status: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a caller-supplied identifier.
    #[inline]
    pub fn with_identifier(mut self, identifier: impl Into<Arc<str>>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Attaches an optional identifier (no-op for `None`).
    #[inline]
    pub fn with_identifier_opt(mut self, identifier: Option<Arc<str>>) -> Self {
        self.identifier = identifier;
        self
    }

    /// Attaches a status kind.
    #[inline]
    pub fn with_status(mut self, status: StatusKind) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
