//! # Type-erased tasks.
//!
//! [`AnyTask`] wraps any [`Task`] so tasks with different success/error types can live
//! in one collection. Only the representation changes: success values become
//! [`AnyValue`], errors become [`AnyError`], and every call forwards to the concrete task
//! with the same state-machine semantics.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::error::TransitionError;
use crate::tasks::id::TaskId;
use crate::tasks::state::{ObserverId, StatusObserver};
use crate::tasks::status::{Progress, TaskStatus};
use crate::tasks::task::Task;

/// Opaque success value.
#[derive(Clone)]
pub struct AnyValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AnyValue {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrows the value as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Name of the concrete type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyValue({})", self.type_name)
    }
}

/// Opaque failure.
pub type AnyError = Arc<dyn std::error::Error + Send + Sync>;

/// Status with opaque payloads.
pub type AnyStatus = TaskStatus<AnyValue, AnyError>;

/// Status stream with opaque payloads.
pub type AnyStatusStream = BoxStream<'static, AnyStatus>;

fn project<T, E>(status: &TaskStatus<T, E>) -> AnyStatus
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    status.map(
        |v| AnyValue::new(v.clone()),
        |e| Arc::new(e.clone()) as AnyError,
    )
}

trait ErasedTask: Send + Sync {
    fn id(&self) -> TaskId;
    fn status(&self) -> AnyStatus;
    fn subscribe(&self) -> AnyStatusStream;
    fn observe(&self, observer: StatusObserver<AnyValue, AnyError>) -> ObserverId;
    fn unobserve(&self, id: ObserverId);
    fn start(&self);
    fn cancel(&self);
    fn pause(&self) -> Result<(), TransitionError>;
    fn resume(&self) -> Result<(), TransitionError>;
    fn progress(&self) -> Option<Progress>;
    fn parent(&self) -> Option<TaskId>;
    fn as_any(&self) -> &dyn Any;
}

impl<K: Task> ErasedTask for K {
    fn id(&self) -> TaskId {
        Task::id(self)
    }

    fn status(&self) -> AnyStatus {
        project(&Task::status(self))
    }

    fn subscribe(&self) -> AnyStatusStream {
        Task::subscribe(self).map(|s| project(&s)).boxed()
    }

    fn observe(&self, observer: StatusObserver<AnyValue, AnyError>) -> ObserverId {
        Task::observe(
            self,
            Box::new(move |s: &TaskStatus<K::Output, K::Error>| observer(&project(s))),
        )
    }

    fn unobserve(&self, id: ObserverId) {
        Task::unobserve(self, id)
    }

    fn start(&self) {
        Task::start(self)
    }

    fn cancel(&self) {
        Task::cancel(self)
    }

    fn pause(&self) -> Result<(), TransitionError> {
        Task::pause(self)
    }

    fn resume(&self) -> Result<(), TransitionError> {
        Task::resume(self)
    }

    fn progress(&self) -> Option<Progress> {
        Task::progress(self)
    }

    fn parent(&self) -> Option<TaskId> {
        Task::parent(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared handle to a task of any success/error type.
///
/// # Example
/// ```
/// use taskgraph::{AnyTask, OperationTask, StatusKind, TaskError};
///
/// let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>("done") });
/// let any = AnyTask::new(task);
/// any.cancel();
/// assert_eq!(any.status().kind(), StatusKind::Canceled);
/// assert!(any.downcast_ref::<OperationTask<&str, TaskError>>().is_some());
/// ```
#[derive(Clone)]
pub struct AnyTask(Arc<dyn ErasedTask>);

impl AnyTask {
    /// Erases `task`.
    pub fn new<K: Task>(task: K) -> Self {
        Self(Arc::new(task))
    }

    /// Identity of the wrapped task.
    pub fn id(&self) -> TaskId {
        self.0.id()
    }

    /// Current status, projected.
    pub fn status(&self) -> AnyStatus {
        self.0.status()
    }

    /// Projected status stream: current status first, ends after a terminal one.
    pub fn subscribe(&self) -> AnyStatusStream {
        self.0.subscribe()
    }

    /// Registers a synchronous observer of projected statuses. See [`Task::observe`].
    pub fn observe(&self, observer: StatusObserver<AnyValue, AnyError>) -> ObserverId {
        self.0.observe(observer)
    }

    /// Removes an observer registered with [`observe`](Self::observe).
    pub fn unobserve(&self, id: ObserverId) {
        self.0.unobserve(id)
    }

    /// Requests `idle → active`. Ignored in any other status.
    pub fn start(&self) {
        self.0.start()
    }

    /// Requests cancellation. Ignored once terminal.
    pub fn cancel(&self) {
        self.0.cancel()
    }

    /// Requests `active → paused`.
    pub fn pause(&self) -> Result<(), TransitionError> {
        self.0.pause()
    }

    /// Requests `paused → active`.
    pub fn resume(&self) -> Result<(), TransitionError> {
        self.0.resume()
    }

    /// Last progress reported by the task, if any.
    pub fn progress(&self) -> Option<Progress> {
        self.0.progress()
    }

    /// Logical parent id; resolve it through [`TaskRegistry::resolve`](crate::TaskRegistry::resolve).
    pub fn parent(&self) -> Option<TaskId> {
        self.0.parent()
    }

    /// Borrows the concrete task if it is a `K`.
    pub fn downcast_ref<K: Task>(&self) -> Option<&K> {
        self.0.as_any().downcast_ref::<K>()
    }
}

impl fmt::Debug for AnyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTask")
            .field("id", &self.id())
            .field("status", &self.status().kind())
            .finish()
    }
}
