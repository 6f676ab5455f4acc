//! # Execution context handed to an operation.
//!
//! [`TaskContext`] is passed by value into every [`OperationTask`](crate::OperationTask)
//! operation. It is the only channel between the running operation and its task:
//! cancellation, pause gating, progress reporting and read-only [`Values`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::Canceled;
use crate::sync::Locked;
use crate::tasks::id::TaskId;
use crate::tasks::status::{Progress, StatusKind};

/// Read-only typed value map, keyed by type.
///
/// Cheap to clone. Built once before the task starts; the operation only reads it.
///
/// # Example
/// ```
/// use taskgraph::Values;
///
/// #[derive(Debug, PartialEq)]
/// struct Endpoint(&'static str);
///
/// let values = Values::new().with(Endpoint("db:5432")).with(3u8);
/// assert_eq!(*values.get::<Endpoint>().unwrap(), Endpoint("db:5432"));
/// assert_eq!(values.get::<u16>(), None);
/// ```
#[derive(Clone, Default)]
pub struct Values(Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>);

impl Values {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a map that also holds `value` (replacing any value of the same type).
    pub fn with<T: Send + Sync + 'static>(self, value: T) -> Self {
        let mut map = Arc::unwrap_or_clone(self.0);
        map.insert(TypeId::of::<T>(), Arc::new(value));
        Self(Arc::new(map))
    }

    /// Looks up the value of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no value is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Values").field("len", &self.len()).finish()
    }
}

/// Handle given to a running operation.
#[derive(Clone)]
pub struct TaskContext {
    id: TaskId,
    parent: Option<TaskId>,
    token: CancellationToken,
    gate: watch::Receiver<StatusKind>,
    progress: Arc<Locked<Option<Progress>>>,
    values: Values,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        parent: Option<TaskId>,
        token: CancellationToken,
        gate: watch::Receiver<StatusKind>,
        progress: Arc<Locked<Option<Progress>>>,
        values: Values,
    ) -> Self {
        Self {
            id,
            parent,
            token,
            gate,
            progress,
            values,
        }
    }

    /// Id of the task running this operation.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Logical parent of the task, if one was set.
    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Cancellation token of the task. Cancelled on `cancel()`, timeout or parent cancellation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Returns `true` while the task is paused.
    pub fn is_paused(&self) -> bool {
        *self.gate.borrow() == StatusKind::Paused
    }

    /// Cooperative suspension point.
    ///
    /// Returns immediately while running, waits while paused, and returns
    /// `Err(Canceled)` once cancellation was requested.
    pub async fn checkpoint(&self) -> Result<(), Canceled> {
        let mut gate = self.gate.clone();
        loop {
            if self.token.is_cancelled() {
                return Err(Canceled);
            }
            match *gate.borrow_and_update() {
                StatusKind::Paused => {}
                StatusKind::Canceled => return Err(Canceled),
                _ => return Ok(()),
            }
            tokio::select! {
                _ = self.token.cancelled() => return Err(Canceled),
                changed = gate.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Records progress. Reports with fewer completed units than the last one are ignored.
    pub fn report_progress(&self, progress: Progress) {
        self.progress.mutate(|current| match current {
            Some(prev) if prev.completed > progress.completed => {}
            _ => *current = Some(progress),
        });
    }

    /// Read-only values supplied when the task was built.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Shorthand for `values().get::<T>()`.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.values.get::<T>()
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("cancelled", &self.is_cancelled())
            .field("paused", &self.is_paused())
            .finish()
    }
}
