//! # LogWriter: registry events through `tracing`
//!
//! A minimal subscriber that renders incoming [`Event`]s as `tracing` records
//! under the `taskgraph` target. Lifecycle events are `info`, failures and delivery
//! problems are `warn`. Install any `tracing` subscriber to see them.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO taskgraph: tracked task=3 identifier=sync-users status=idle
//! INFO taskgraph: status changed task=3 identifier=sync-users status=active
//! WARN taskgraph: evicted task=3 identifier=sync-users status=error reason=connection reset
//! WARN taskgraph: subscriber overflow subscriber=metrics reason=full
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use crate::tasks::StatusKind;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn task_label(e: &Event) -> String {
    e.task.map(|t| t.to_string()).unwrap_or_else(|| "-".into())
}

fn status_label(e: &Event) -> &'static str {
    e.status.map(|s| s.as_label()).unwrap_or("-")
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let identifier = e.identifier.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskTracked => {
                info!(target: "taskgraph", seq = e.seq, "tracked task={} identifier={identifier} status={}", task_label(e), status_label(e));
            }
            EventKind::StatusChanged => {
                info!(target: "taskgraph", seq = e.seq, "status changed task={} identifier={identifier} status={}", task_label(e), status_label(e));
            }
            EventKind::TaskEvicted if e.status == Some(StatusKind::Error) => {
                warn!(
                    target: "taskgraph",
                    seq = e.seq,
                    "evicted task={} identifier={identifier} status=error reason={}",
                    task_label(e),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
            EventKind::TaskEvicted => {
                info!(target: "taskgraph", seq = e.seq, "evicted task={} identifier={identifier} status={}", task_label(e), status_label(e));
            }
            EventKind::CancelRequested => {
                info!(target: "taskgraph", seq = e.seq, "cancel requested task={} identifier={identifier}", task_label(e));
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: "taskgraph",
                    seq = e.seq,
                    "subscriber overflow subscriber={} reason={}",
                    e.subscriber.unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    target: "taskgraph",
                    seq = e.seq,
                    "subscriber panicked subscriber={} info={}",
                    e.subscriber.unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
