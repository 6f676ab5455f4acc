//! # Function-backed task (`OperationTask`)
//!
//! [`OperationTask`] wraps a closure `F: FnOnce(TaskContext) -> Fut` and runs it at most
//! once, on the current Tokio runtime, when the task is started.
//!
//! ## Architecture
//! ```text
//! start() ── apply(Start) ──► tokio::spawn(drive)
//!                                 │
//!                                 ├─ token.cancelled()  ─► apply(Cancel)
//!                                 ├─ op(ctx) → Ok(v)    ─► settle(Succeed(v))
//!                                 ├─ op(ctx) → Err(e)   ─► settle(Fail(e))
//!                                 └─ timeout elapsed    ─► cancel token, settle(Fail(Timeout))
//!
//! settle: while status is Paused, wait for resume/cancel/token, then apply.
//! ```
//!
//! ## Rules
//! - Cancel before start: the closure is dropped and never called.
//! - Cancel while running: status becomes `Canceled` immediately, then the token is
//!   cancelled. The operation is still awaited to completion (cooperative), and its
//!   result is discarded.
//! - Completion while paused is held until `resume()` (applied) or `cancel()` (discarded).
//!   A parent token fired while a completion is held cancels the task too.
//! - `start()` outside a Tokio runtime is ignored: the task stays `Idle`.
//! - Pausing is opt-in ([`OperationTaskBuilder::pausable`]). The operation observes
//!   pauses at [`TaskContext::checkpoint`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{TaskError, TransitionError};
use crate::sync::Locked;
use crate::tasks::context::{TaskContext, Values};
use crate::tasks::id::TaskId;
use crate::tasks::state::{ObserverId, StatusCell, StatusObserver, Trigger};
use crate::tasks::status::{Progress, StatusKind, TaskStatus};
use crate::tasks::stream::StatusStream;
use crate::tasks::task::Task;

type Launch<T, E> = Box<dyn FnOnce(TaskContext) -> BoxFuture<'static, Result<T, E>> + Send>;

fn timeout_error<E: From<TaskError>>(timeout: Duration) -> E {
    TaskError::Timeout { timeout }.into()
}

struct Core<T, E> {
    id: TaskId,
    parent: Option<TaskId>,
    pausable: bool,
    timeout: Option<(Duration, fn(Duration) -> E)>,
    values: Values,
    token: CancellationToken,
    cell: StatusCell<T, E>,
    gate: Arc<watch::Sender<StatusKind>>,
    progress: Arc<Locked<Option<Progress>>>,
    launch: Mutex<Option<Launch<T, E>>>,
}

impl<T, E> Core<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    fn context(&self) -> TaskContext {
        TaskContext::new(
            self.id,
            self.parent,
            self.token.clone(),
            self.gate.subscribe(),
            self.progress.clone(),
            self.values.clone(),
        )
    }

    async fn drive(self: Arc<Self>, op: BoxFuture<'static, Result<T, E>>) {
        if self.token.is_cancelled() {
            let _ = self.cell.apply(Trigger::Cancel);
            return;
        }

        let mut op = op;
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some((after, _)) => tokio::time::sleep(after).await,
                None => futures::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                let _ = self.cell.apply(Trigger::Cancel);
                let _ = op.await;
            }
            res = &mut op => match res {
                Ok(value) => self.settle(Trigger::Succeed(value), true).await,
                Err(err) => self.settle(Trigger::Fail(err), true).await,
            },
            _ = &mut deadline => {
                if let Some((after, make)) = timeout {
                    self.token.cancel();
                    self.settle(Trigger::Fail(make(after)), false).await;
                }
                let _ = op.await;
            }
        }
    }

    /// Applies a completion, holding it while the task is paused.
    ///
    /// With `watch_token`, a token cancelled during the hold cancels the task instead.
    async fn settle(&self, trigger: Trigger<T, E>, watch_token: bool) {
        let mut gate = self.gate.subscribe();
        loop {
            match self.cell.apply(trigger.clone()) {
                Err(StatusKind::Paused) => {
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled(), if watch_token => {
                            let _ = self.cell.apply(Trigger::Cancel);
                            return;
                        }
                        changed = gate.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                    }
                }
                _ => return,
            }
        }
    }
}

/// Function-backed [`Task`].
///
/// Cheap to clone: clones share the same task.
///
/// # Example
/// ```
/// use taskgraph::{OperationTask, Task, TaskError, TaskStatus};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(6 * 7) });
/// task.start();
/// assert_eq!(task.join().await, TaskStatus::Success(42));
/// # }
/// ```
pub struct OperationTask<T, E> {
    core: Arc<Core<T, E>>,
}

impl<T, E> Clone for OperationTask<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T, E> OperationTask<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    /// Starts building a task around `op`.
    pub fn builder<F, Fut>(op: F) -> OperationTaskBuilder<T, E>
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        OperationTaskBuilder {
            launch: Box::new(move |ctx| op(ctx).boxed()),
            pausable: false,
            timeout: None,
            values: Values::default(),
            parent: None,
            token: CancellationToken::new(),
        }
    }

    /// Task with default options (not pausable, no timeout, no values).
    pub fn new<F, Fut>(op: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::builder(op).build()
    }

    /// Waits for a terminal status and returns it.
    ///
    /// Never completes for a task that is never started or cancelled.
    pub async fn join(&self) -> TaskStatus<T, E> {
        match self.core.cell.subscribe().last().await {
            Some(status) => status,
            None => self.core.cell.status(),
        }
    }

    /// Cancellation token handed to the operation.
    pub fn token(&self) -> &CancellationToken {
        &self.core.token
    }
}

impl<T, E> Task for OperationTask<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    fn id(&self) -> TaskId {
        self.core.id
    }

    fn status(&self) -> TaskStatus<T, E> {
        self.core.cell.status()
    }

    fn subscribe(&self) -> StatusStream<T, E> {
        self.core.cell.subscribe()
    }

    fn observe(&self, observer: StatusObserver<T, E>) -> ObserverId {
        self.core.cell.observe(observer)
    }

    fn unobserve(&self, id: ObserverId) {
        self.core.cell.unobserve(id)
    }

    /// Spawns the operation on the current Tokio runtime.
    ///
    /// Outside a runtime the call is ignored (and logged): the task stays `Idle`.
    fn start(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: "taskgraph", task = %self.core.id, "start ignored: no Tokio runtime");
            return;
        };
        if self.core.cell.apply(Trigger::Start).is_err() {
            return;
        }
        let Some(launch) = self.core.launch.lock().take() else {
            return;
        };
        let core = self.core.clone();
        runtime.spawn(async move {
            let op = launch(core.context());
            core.drive(op).await;
        });
    }

    fn cancel(&self) {
        if let Ok(prev) = self.core.cell.apply(Trigger::Cancel) {
            if prev == StatusKind::Idle {
                drop(self.core.launch.lock().take());
            }
            self.core.token.cancel();
        }
    }

    fn pause(&self) -> Result<(), TransitionError> {
        if !self.core.pausable {
            return Err(TransitionError::Unsupported { op: "pause" });
        }
        self.core
            .cell
            .apply(Trigger::Pause)
            .map(|_| ())
            .map_err(|status| TransitionError::NotApplicable { op: "pause", status })
    }

    fn resume(&self) -> Result<(), TransitionError> {
        if !self.core.pausable {
            return Err(TransitionError::Unsupported { op: "resume" });
        }
        self.core
            .cell
            .apply(Trigger::Resume)
            .map(|_| ())
            .map_err(|status| TransitionError::NotApplicable {
                op: "resume",
                status,
            })
    }

    fn progress(&self) -> Option<Progress> {
        self.core.progress.get()
    }

    fn parent(&self) -> Option<TaskId> {
        self.core.parent
    }
}

impl<T, E> fmt::Debug for OperationTask<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTask")
            .field("id", &self.core.id)
            .field("parent", &self.core.parent)
            .field("pausable", &self.core.pausable)
            .finish()
    }
}

/// Builder for [`OperationTask`].
pub struct OperationTaskBuilder<T, E> {
    launch: Launch<T, E>,
    pausable: bool,
    timeout: Option<(Duration, fn(Duration) -> E)>,
    values: Values,
    parent: Option<TaskId>,
    token: CancellationToken,
}

impl<T, E> OperationTaskBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: std::error::Error + Clone + Send + Sync + 'static,
{
    /// Enables `pause()`/`resume()`.
    pub fn pausable(mut self) -> Self {
        self.pausable = true;
        self
    }

    /// Read-only values exposed through [`TaskContext::values`].
    pub fn values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    /// Logical parent, reported by [`Task::parent`] and [`TaskContext::parent`].
    pub fn parent(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Ties the task to `parent`: cancelling `parent` cancels the task.
    pub fn cancel_with(mut self, parent: &CancellationToken) -> Self {
        self.token = parent.child_token();
        self
    }

    /// Finishes the task in `Idle`.
    pub fn build(self) -> OperationTask<T, E> {
        let (gate, _) = watch::channel(StatusKind::Idle);
        let gate = Arc::new(gate);

        let cell = StatusCell::new();
        let sender = gate.clone();
        cell.observe(Box::new(move |status: &TaskStatus<T, E>| {
            sender.send_replace(status.kind());
        }));

        OperationTask {
            core: Arc::new(Core {
                id: TaskId::next(),
                parent: self.parent,
                pausable: self.pausable,
                timeout: self.timeout,
                values: self.values,
                token: self.token,
                cell,
                gate,
                progress: Arc::new(Locked::new(None)),
                launch: Mutex::new(Some(self.launch)),
            }),
        }
    }
}

impl<T, E> OperationTaskBuilder<T, E>
where
    E: From<TaskError>,
{
    /// Fails the task with [`TaskError::Timeout`] if the operation runs longer than `timeout`.
    ///
    /// The operation's token is cancelled when the timeout elapses.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some((timeout, timeout_error::<E>));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    async fn collect<T: Clone, E: Clone>(mut s: StatusStream<T, E>) -> Vec<TaskStatus<T, E>> {
        let mut out = Vec::new();
        while let Some(st) = s.next().await {
            out.push(st);
        }
        out
    }

    #[tokio::test]
    async fn test_lifecycle_reaches_success() {
        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(42) });
        let stream = task.subscribe();
        task.start();
        assert_eq!(
            collect(stream).await,
            vec![TaskStatus::Idle, TaskStatus::Active, TaskStatus::Success(42)]
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_as_error() {
        let task = OperationTask::new(|_ctx| async { Err::<u8, _>(TaskError::fail("boom")) });
        task.start();
        assert_eq!(task.join().await, TaskStatus::Error(TaskError::fail("boom")));
    }

    #[tokio::test]
    async fn test_cancel_before_start_never_runs_operation() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task = OperationTask::new(move |_ctx| async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        });

        task.cancel();
        task.start();
        tokio::task::yield_now().await;

        assert_eq!(task.status(), TaskStatus::Canceled);
        assert!(!ran.load(Ordering::SeqCst));
        assert!(task.core.launch.lock().is_none());
    }

    #[tokio::test]
    async fn test_cancel_wins_over_late_success() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let task = OperationTask::new(|_ctx| async move {
            let _ = release_rx.await;
            Ok::<_, TaskError>(1)
        });
        task.start();
        task.cancel();
        assert_eq!(task.status(), TaskStatus::Canceled);
        assert!(task.token().is_cancelled());

        let _ = release_tx.send(());
        assert_eq!(task.join().await, TaskStatus::Canceled);
    }

    #[tokio::test]
    async fn test_pause_requires_opt_in() {
        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(()) });
        assert_eq!(task.pause(), Err(TransitionError::Unsupported { op: "pause" }));
        assert_eq!(task.resume(), Err(TransitionError::Unsupported { op: "resume" }));

        let task = OperationTask::builder(|_ctx| async { Ok::<_, TaskError>(()) })
            .pausable()
            .build();
        assert_eq!(
            task.pause(),
            Err(TransitionError::NotApplicable {
                op: "pause",
                status: StatusKind::Idle
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_held_while_paused() {
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let task = OperationTask::builder(|_ctx| async move {
            let _ = release_rx.await;
            Ok::<_, TaskError>(5)
        })
        .pausable()
        .build();
        let stream = task.subscribe();

        task.start();
        task.pause().unwrap();
        let _ = release_tx.send(());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(task.status(), TaskStatus::Paused);

        task.resume().unwrap();
        assert_eq!(task.join().await, TaskStatus::Success(5));
        assert_eq!(
            collect(stream).await,
            vec![
                TaskStatus::Idle,
                TaskStatus::Active,
                TaskStatus::Paused,
                TaskStatus::Active,
                TaskStatus::Success(5)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_blocks_operation_while_paused() {
        let task = OperationTask::builder(|ctx: TaskContext| async move {
            for i in 1..=3 {
                ctx.checkpoint().await?;
                ctx.report_progress(Progress::of(i, 3));
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok::<_, TaskError>(())
        })
        .pausable()
        .build();

        task.start();
        tokio::time::sleep(Duration::from_millis(15)).await;
        task.pause().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(task.progress(), Some(Progress::of(2, 3)));

        task.resume().unwrap();
        assert_eq!(task.join().await, TaskStatus::Success(()));
        assert_eq!(task.progress(), Some(Progress::of(3, 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_paused_releases_checkpoint() {
        let task = OperationTask::<(), TaskError>::builder(|ctx: TaskContext| async move {
            loop {
                if let Err(canceled) = ctx.checkpoint().await {
                    return Err(TaskError::from(canceled));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .pausable()
        .build();

        task.start();
        tokio::time::sleep(Duration::from_millis(5)).await;
        task.pause().unwrap();
        task.cancel();
        assert_eq!(task.join().await, TaskStatus::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_task() {
        let task = OperationTask::builder(|ctx: TaskContext| async move {
            ctx.cancelled().await;
            Err::<(), _>(TaskError::Canceled)
        })
        .timeout(Duration::from_secs(1))
        .build();

        task.start();
        assert_eq!(
            task.join().await,
            TaskStatus::Error(TaskError::Timeout {
                timeout: Duration::from_secs(1)
            })
        );
        assert!(task.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_token_cancels_task() {
        let parent = CancellationToken::new();
        let task = OperationTask::builder(|ctx: TaskContext| async move {
            ctx.cancelled().await;
            Ok::<_, TaskError>(())
        })
        .cancel_with(&parent)
        .build();

        task.start();
        parent.cancel();
        assert_eq!(task.join().await, TaskStatus::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancel_discards_result_held_while_paused() {
        let parent = CancellationToken::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let task = OperationTask::builder(|_ctx| async move {
            let _ = release_rx.await;
            Ok::<_, TaskError>(1)
        })
        .pausable()
        .cancel_with(&parent)
        .build();

        task.start();
        task.pause().unwrap();
        let _ = release_tx.send(());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(task.status(), TaskStatus::Paused);

        parent.cancel();
        assert_eq!(task.join().await, TaskStatus::Canceled);
        assert_eq!(
            task.resume(),
            Err(TransitionError::NotApplicable {
                op: "resume",
                status: StatusKind::Canceled
            })
        );
    }

    #[test]
    fn test_start_outside_runtime_stays_idle() {
        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(3) });
        task.start();
        assert_eq!(task.status(), TaskStatus::Idle);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let done = rt.block_on(async {
            task.start();
            task.join().await
        });
        assert_eq!(done, TaskStatus::Success(3));
    }

    #[tokio::test]
    async fn test_context_carries_identity_and_values() {
        let parent = TaskId::next();
        let task = OperationTask::builder(|ctx: TaskContext| async move {
            let limit = ctx.value::<u32>().map(|v| *v).unwrap_or_default();
            Ok::<_, TaskError>((ctx.id(), ctx.parent(), limit))
        })
        .values(Values::new().with(7u32))
        .parent(parent)
        .build();

        task.start();
        let id = task.id();
        assert_eq!(task.join().await, TaskStatus::Success((id, Some(parent), 7)));
        assert_eq!(task.parent(), Some(parent));
    }
}
