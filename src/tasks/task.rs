//! # Task abstraction.
//!
//! A [`Task`] is a shared handle to one unit of asynchronous work with an observable
//! status. External callers only *request* transitions (`start`, `pause`, `resume`,
//! `cancel`); the task's own logic decides when the operation succeeded or failed.
//!
//! ## Rules
//! - `start()` and `cancel()` never fail. They are ignored when not applicable.
//! - `pause()`/`resume()` fail with [`TransitionError::Unsupported`] unless the task
//!   kind implements pausing.
//! - Every transition is published to observers before the requesting call returns.

use crate::error::TransitionError;
use crate::tasks::id::TaskId;
use crate::tasks::state::{ObserverId, StatusObserver};
use crate::tasks::status::{Progress, TaskStatus};
use crate::tasks::stream::StatusStream;

/// # Observable, cancelable unit of work.
///
/// Custom kinds usually delegate status bookkeeping to a [`StatusCell`](crate::StatusCell).
///
/// # Example
/// ```
/// use taskgraph::{
///     ObserverId, StatusCell, StatusObserver, StatusStream, Task, TaskError, TaskId,
///     TaskStatus, Trigger,
/// };
///
/// /// Completed by hand, e.g. from a callback API.
/// struct Manual {
///     id: TaskId,
///     cell: StatusCell<u32, TaskError>,
/// }
///
/// impl Manual {
///     fn complete(&self, v: u32) {
///         let _ = self.cell.apply(Trigger::Succeed(v));
///     }
/// }
///
/// impl Task for Manual {
///     type Output = u32;
///     type Error = TaskError;
///
///     fn id(&self) -> TaskId { self.id }
///     fn status(&self) -> TaskStatus<u32, TaskError> { self.cell.status() }
///     fn subscribe(&self) -> StatusStream<u32, TaskError> { self.cell.subscribe() }
///     fn observe(&self, o: StatusObserver<u32, TaskError>) -> ObserverId { self.cell.observe(o) }
///     fn unobserve(&self, id: ObserverId) { self.cell.unobserve(id) }
///     fn start(&self) { let _ = self.cell.apply(Trigger::Start); }
///     fn cancel(&self) { let _ = self.cell.apply(Trigger::Cancel); }
/// }
///
/// let t = Manual { id: TaskId::next(), cell: StatusCell::new() };
/// t.start();
/// t.complete(7);
/// assert_eq!(t.status(), TaskStatus::Success(7));
/// assert!(t.pause().is_err());
/// ```
pub trait Task: Send + Sync + 'static {
    /// Success payload.
    type Output: Clone + Send + Sync + 'static;
    /// Failure payload.
    type Error: std::error::Error + Clone + Send + Sync + 'static;

    /// Stable identity assigned at creation.
    fn id(&self) -> TaskId;

    /// Current status.
    fn status(&self) -> TaskStatus<Self::Output, Self::Error>;

    /// Ordered status stream: current status first, ends after a terminal one.
    fn subscribe(&self) -> StatusStream<Self::Output, Self::Error>;

    /// Registers a synchronous observer (see [`StatusCell::observe`](crate::StatusCell::observe)).
    fn observe(&self, observer: StatusObserver<Self::Output, Self::Error>) -> ObserverId;

    /// Removes an observer.
    fn unobserve(&self, id: ObserverId);

    /// Requests `idle → active`. Ignored in any other status.
    fn start(&self);

    /// Requests cancellation. Ignored once terminal.
    fn cancel(&self);

    /// Requests `active → paused`.
    fn pause(&self) -> Result<(), TransitionError> {
        Err(TransitionError::Unsupported { op: "pause" })
    }

    /// Requests `paused → active`.
    fn resume(&self) -> Result<(), TransitionError> {
        Err(TransitionError::Unsupported { op: "resume" })
    }

    /// Last progress reported by the operation, if any.
    fn progress(&self) -> Option<Progress> {
        None
    }

    /// Logical parent, resolvable through [`TaskRegistry::resolve`](crate::TaskRegistry::resolve).
    fn parent(&self) -> Option<TaskId> {
        None
    }
}
