//! # Serialized task state machine.
//!
//! [`StatusCell`] owns a task's status and its observers behind one lock. Every
//! transition is validated against the edge table, applied, and published to all
//! observers before the lock is released, so:
//!
//! - transitions of one task are totally ordered for every observer;
//! - a caller that triggered a transition returns only after it was published;
//! - an observer added after a transition sees it once (as the current value) and never twice;
//! - after a terminal status, nothing changes and all observers are released.
//!
//! ## Architecture
//! ```text
//! start/pause/resume/cancel/complete
//!        │
//!        ▼
//! StatusCell::apply(Trigger) ── lock ──► check edge ──► set status ──► notify sinks ── unlock
//!                                                                      ├─► callback(&status)
//!                                                                      └─► channel.send(status)
//! ```

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::tasks::status::{StatusKind, TaskStatus};
use crate::tasks::stream::StatusStream;

/// Synchronous status observer. Runs inside the cell's critical scope: it must not
/// request transitions on (or read the status of) the same task.
pub type StatusObserver<T, E> = Box<dyn Fn(&TaskStatus<T, E>) + Send + Sync>;

/// Handle returned by [`StatusCell::observe`], used to remove the observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Event driving a transition.
#[derive(Clone, Debug)]
pub enum Trigger<T, E> {
    /// `idle → active`
    Start,
    /// `active → paused`
    Pause,
    /// `paused → active`
    Resume,
    /// `idle | active | paused → canceled`
    Cancel,
    /// `active → success`
    Succeed(T),
    /// `active → error`
    Fail(E),
}

impl<T, E> Trigger<T, E> {
    fn accepts(&self, from: StatusKind) -> bool {
        match self {
            Trigger::Start => from == StatusKind::Idle,
            Trigger::Pause => from == StatusKind::Active,
            Trigger::Resume => from == StatusKind::Paused,
            Trigger::Cancel => matches!(
                from,
                StatusKind::Idle | StatusKind::Active | StatusKind::Paused
            ),
            Trigger::Succeed(_) | Trigger::Fail(_) => from == StatusKind::Active,
        }
    }

    fn into_status(self) -> TaskStatus<T, E> {
        match self {
            Trigger::Start | Trigger::Resume => TaskStatus::Active,
            Trigger::Pause => TaskStatus::Paused,
            Trigger::Cancel => TaskStatus::Canceled,
            Trigger::Succeed(v) => TaskStatus::Success(v),
            Trigger::Fail(e) => TaskStatus::Error(e),
        }
    }
}

enum Sink<T, E> {
    Callback(StatusObserver<T, E>),
    Channel(mpsc::UnboundedSender<TaskStatus<T, E>>),
}

struct Inner<T, E> {
    status: TaskStatus<T, E>,
    sinks: Vec<(ObserverId, Sink<T, E>)>,
    next_observer: u64,
}

impl<T: Clone, E: Clone> Inner<T, E> {
    fn alloc_id(&mut self) -> ObserverId {
        self.next_observer += 1;
        ObserverId(self.next_observer)
    }

    fn notify(&mut self) {
        let status = &self.status;
        self.sinks.retain(|(_, sink)| match sink {
            Sink::Callback(f) => {
                f(status);
                true
            }
            Sink::Channel(tx) => tx.send(status.clone()).is_ok(),
        });
        if status.is_terminal() {
            self.sinks.clear();
        }
    }
}

/// A task's status plus its observers, mutated only through [`apply`](Self::apply).
///
/// Reusable by custom [`Task`](crate::Task) implementations.
///
/// # Example
/// ```rust
/// use taskgraph::{StatusCell, StatusKind, TaskStatus, Trigger};
///
/// let cell: StatusCell<u32, String> = StatusCell::new();
/// let mut stream = cell.subscribe();
///
/// assert_eq!(cell.apply(Trigger::Start), Ok(StatusKind::Idle));
/// assert_eq!(cell.apply(Trigger::Succeed(42)), Ok(StatusKind::Active));
/// assert_eq!(cell.apply(Trigger::Cancel), Err(StatusKind::Success));
///
/// assert_eq!(stream.try_next(), Some(TaskStatus::Idle));
/// assert_eq!(stream.try_next(), Some(TaskStatus::Active));
/// assert_eq!(stream.try_next(), Some(TaskStatus::Success(42)));
/// assert_eq!(stream.try_next(), None);
/// ```
pub struct StatusCell<T, E> {
    inner: Mutex<Inner<T, E>>,
}

impl<T: Clone, E: Clone> StatusCell<T, E> {
    /// Creates a cell in [`TaskStatus::Idle`].
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: TaskStatus::Idle,
                sinks: Vec::new(),
                next_observer: 0,
            }),
        }
    }

    /// Returns a clone of the current status.
    pub fn status(&self) -> TaskStatus<T, E> {
        self.inner.lock().status.clone()
    }

    /// Returns the kind of the current status.
    pub fn kind(&self) -> StatusKind {
        self.inner.lock().status.kind()
    }

    /// Applies `trigger` if it is an edge from the current status.
    ///
    /// Returns `Ok(previous)` after the new status was published, or
    /// `Err(current)` if the trigger does not apply (nothing is published).
    pub fn apply(&self, trigger: Trigger<T, E>) -> Result<StatusKind, StatusKind> {
        let mut inner = self.inner.lock();
        let from = inner.status.kind();
        if !trigger.accepts(from) {
            return Err(from);
        }
        inner.status = trigger.into_status();
        debug_assert!(from.can_transition_to(inner.status.kind()));
        inner.notify();
        Ok(from)
    }

    /// Opens a [`StatusStream`] starting at the current status.
    pub fn subscribe(&self) -> StatusStream<T, E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let _ = tx.send(inner.status.clone());
        if !inner.status.is_terminal() {
            let id = inner.alloc_id();
            inner.sinks.push((id, Sink::Channel(tx)));
        }
        StatusStream::new(rx)
    }

    /// Registers a synchronous observer; it is called with the current status
    /// immediately, then with every later transition until a terminal one.
    pub fn observe(&self, observer: StatusObserver<T, E>) -> ObserverId {
        let mut inner = self.inner.lock();
        observer(&inner.status);
        let id = inner.alloc_id();
        if !inner.status.is_terminal() {
            inner.sinks.push((id, Sink::Callback(observer)));
        }
        id
    }

    /// Removes an observer registered with [`observe`](Self::observe). Unknown ids are ignored.
    pub fn unobserve(&self, id: ObserverId) {
        self.inner.lock().sinks.retain(|(sid, _)| *sid != id);
    }
}

impl<T: Clone, E: Clone> Default for StatusCell<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
