use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::DropGuard;

use crate::config::Config;
use crate::events::{Bus, Event, EventKind};
use crate::registry::builder::RegistryBuilder;
use crate::registry::element::{RegistryElement, Resolved, StatusSnapshot};
use crate::registry::tables::Tables;
use crate::tasks::{AnyStatus, AnyTask, Task, TaskId};

struct Inner {
    tables: Mutex<Tables>,
    bus: Bus,
    _listener: Option<DropGuard>,
}

impl Inner {
    /// Status observer body. Runs under the task's lock; takes the registry lock after it.
    fn on_status(&self, id: TaskId, status: &AnyStatus) {
        let mut tables = self.tables.lock();
        if let Some(ev) = tables.update(id, status) {
            self.bus.publish(ev);
        }
    }
}

/// Concurrent registry of live tasks with per-identifier history.
///
/// Cheap to clone: clones share the same maps.
///
/// # Example
/// ```
/// use taskgraph::{Config, OperationTask, StatusKind, TaskError, TaskRegistry};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = TaskRegistry::new(Config::default());
/// let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(1) });
///
/// registry.run(task.clone(), Some("nightly"));
/// task.join().await;
///
/// assert!(registry.lookup("nightly").is_none());
/// assert_eq!(registry.last_status("nightly").map(|s| s.kind()), Some(StatusKind::Success));
/// # }
/// ```
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Inner>,
}

impl TaskRegistry {
    /// Registry without subscribers.
    pub fn new(cfg: Config) -> Self {
        RegistryBuilder::new(cfg).build()
    }

    /// Starts a [`RegistryBuilder`].
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }

    pub(super) fn from_parts(cfg: &Config, bus: Bus, listener: Option<DropGuard>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::new(cfg.history_cap())),
                bus,
                _listener: listener,
            }),
        }
    }

    /// Tracks `task` under an optional identifier.
    ///
    /// Returns `false` (and does nothing) if the task is already live in this registry
    /// or its terminal status is already recorded. A task that is already terminal is
    /// recorded straight into history.
    pub fn track<K: Task>(&self, task: K, identifier: Option<&str>) -> bool {
        self.track_any(AnyTask::new(task), identifier)
    }

    /// [`track`](Self::track) for an already erased task.
    pub fn track_any(&self, task: AnyTask, identifier: Option<&str>) -> bool {
        let id = task.id();
        let status = task.status();
        {
            let mut tables = self.inner.tables.lock();
            match tables.insert(id, task.clone(), identifier.map(Arc::from), status) {
                Some(ev) => self.inner.bus.publish(ev),
                None => return false,
            }
        }

        let registry = Arc::downgrade(&self.inner);
        task.observe(Box::new(move |status: &AnyStatus| {
            if let Some(inner) = registry.upgrade() {
                inner.on_status(id, status);
            }
        }));
        true
    }

    /// Tracks `task`, then starts it. Returns whether the task was newly tracked.
    pub fn run<K: Task>(&self, task: K, identifier: Option<&str>) -> bool {
        let task = AnyTask::new(task);
        let tracked = self.track_any(task.clone(), identifier);
        task.start();
        tracked
    }

    /// Most recently registered live task under `identifier`.
    ///
    /// History is not consulted: use [`last_status`](Self::last_status) for finished tasks.
    pub fn lookup(&self, identifier: &str) -> Option<AnyTask> {
        let tables = self.inner.tables.lock();
        tables.lookup(identifier).map(|(_, e)| e.task.clone())
    }

    /// Most recently recorded terminal status under `identifier`.
    pub fn last_status(&self, identifier: &str) -> Option<AnyStatus> {
        let tables = self.inner.tables.lock();
        tables.last_status(identifier).map(|s| s.status.clone())
    }

    /// All recorded terminal statuses under `identifier`, oldest first.
    pub fn history(&self, identifier: &str) -> Vec<StatusSnapshot> {
        self.inner.tables.lock().history(identifier)
    }

    /// Cancels the live task under `identifier`. Returns `false` if there is none.
    pub fn cancel(&self, identifier: &str) -> bool {
        let target = {
            let tables = self.inner.tables.lock();
            tables
                .lookup(identifier)
                .map(|(id, e)| (id, e.task.clone(), e.identifier.clone()))
        };
        match target {
            Some((id, task, identifier)) => {
                self.request_cancel(id, &task, identifier);
                true
            }
            None => false,
        }
    }

    /// Cancels every live task independently. Returns how many were asked to cancel.
    pub fn cancel_all(&self) -> usize {
        let targets = self.inner.tables.lock().live_tasks();
        let n = targets.len();
        for (id, task, identifier) in targets {
            self.request_cancel(id, &task, identifier);
        }
        n
    }

    fn request_cancel(&self, id: TaskId, task: &AnyTask, identifier: Option<Arc<str>>) {
        self.inner.bus.publish(
            Event::new(EventKind::CancelRequested)
                .with_task(id)
                .with_identifier_opt(identifier),
        );
        task.cancel();
    }

    /// One element per identifier ever seen (live or tombstone), sorted by identifier,
    /// followed by anonymous live tasks in id order.
    pub fn snapshot(&self) -> Vec<RegistryElement> {
        self.inner.tables.lock().elements()
    }

    /// Looks up a task by id, e.g. a logical parent from [`Task::parent`].
    pub fn resolve(&self, id: TaskId) -> Resolved {
        self.inner.tables.lock().resolve(id)
    }

    /// Receiver for registry events (one per map mutation, plus cancel requests).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Number of live tasks.
    pub fn live_count(&self) -> usize {
        self.inner.tables.lock().live_count()
    }

    /// Returns `true` if no task is live.
    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::subscribers::Subscribe;
    use crate::tasks::{OperationTask, StatusKind, TaskContext, TaskStatus};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn waits_for_cancel() -> OperationTask<(), TaskError> {
        OperationTask::new(|ctx: TaskContext| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        })
    }

    fn kind(s: Option<AnyStatus>) -> Option<StatusKind> {
        s.map(|s| s.kind())
    }

    #[tokio::test]
    async fn test_finished_task_becomes_tombstone() {
        let registry = TaskRegistry::default();
        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(42u32) });

        assert!(registry.run(task.clone(), Some("answer")));
        task.join().await;

        assert!(registry.lookup("answer").is_none());
        assert!(registry.is_empty());
        match registry.last_status("answer") {
            Some(TaskStatus::Success(v)) => assert_eq!(v.downcast_ref::<u32>(), Some(&42)),
            other => panic!("unexpected {other:?}"),
        }

        let els = registry.snapshot();
        assert_eq!(els.len(), 1);
        assert!(els[0].is_tombstone());
        assert_eq!(els[0].identifier(), Some("answer"));
    }

    #[tokio::test]
    async fn test_same_identifier_lookup_and_last_status_diverge() {
        let registry = TaskRegistry::default();

        let first = OperationTask::new(|_ctx| async { Err::<(), _>(TaskError::fail("first")) });
        registry.run(first.clone(), Some("job"));
        first.join().await;

        let (release, released) = oneshot::channel::<()>();
        let second = OperationTask::new(move |_ctx| async move {
            let _ = released.await;
            Ok::<_, TaskError>(())
        });
        registry.run(second.clone(), Some("job"));

        assert_eq!(registry.lookup("job").map(|t| t.id()), Some(second.id()));
        assert_eq!(kind(registry.last_status("job")), Some(StatusKind::Error));
        match &registry.snapshot()[..] {
            [RegistryElement::Live { status, history, .. }] => {
                assert_eq!(status.kind(), StatusKind::Active);
                assert_eq!(history.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let _ = release.send(());
        second.join().await;
        assert!(registry.lookup("job").is_none());
        assert_eq!(kind(registry.last_status("job")), Some(StatusKind::Success));
        assert_eq!(registry.history("job").len(), 2);
    }

    #[tokio::test]
    async fn test_tracking_terminal_task_records_history() {
        let registry = TaskRegistry::default();
        let task = waits_for_cancel();
        task.cancel();

        assert!(registry.track(task.clone(), Some("late")));
        assert!(registry.is_empty());
        assert_eq!(kind(registry.last_status("late")), Some(StatusKind::Canceled));
        assert!(!registry.track(task, Some("late")));
        assert_eq!(registry.history("late").len(), 1);
    }

    #[tokio::test]
    async fn test_track_twice_is_noop() {
        let registry = TaskRegistry::default();
        let task = waits_for_cancel();
        assert!(registry.track(task.clone(), Some("a")));
        assert!(!registry.track(task.clone(), Some("b")));
        assert!(registry.lookup("b").is_none());
        assert_eq!(registry.live_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_by_identifier_and_all() {
        let registry = TaskRegistry::default();
        let tasks: Vec<_> = (0..3).map(|_| waits_for_cancel()).collect();
        registry.run(tasks[0].clone(), Some("one"));
        registry.run(tasks[1].clone(), Some("two"));
        registry.run(tasks[2].clone(), None);

        assert!(registry.cancel("one"));
        assert!(!registry.cancel("one"));
        assert!(!registry.cancel("missing"));
        assert_eq!(kind(registry.last_status("one")), Some(StatusKind::Canceled));

        assert_eq!(registry.cancel_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(kind(registry.last_status("two")), Some(StatusKind::Canceled));
        for t in &tasks {
            assert_eq!(t.join().await, TaskStatus::Canceled);
        }
        assert_eq!(registry.cancel_all(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let registry = TaskRegistry::default();
        let mut rx = registry.subscribe();
        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(()) });
        registry.run(task.clone(), Some("evt"));
        task.join().await;

        let mut seen = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            assert_eq!(ev.task, Some(task.id()));
            assert_eq!(ev.identifier.as_deref(), Some("evt"));
            seen.push((ev.kind, ev.status));
        }
        assert_eq!(
            seen,
            vec![
                (EventKind::TaskTracked, Some(StatusKind::Idle)),
                (EventKind::StatusChanged, Some(StatusKind::Active)),
                (EventKind::TaskEvicted, Some(StatusKind::Success)),
            ]
        );
    }

    #[tokio::test]
    async fn test_resolve_parent_relation() {
        let registry = TaskRegistry::default();
        let parent = waits_for_cancel();
        registry.run(parent.clone(), Some("parent"));

        let child = OperationTask::builder(|_ctx| async { Ok::<_, TaskError>(()) })
            .parent(parent.id())
            .build();
        let parent_id = child.parent().unwrap();
        assert!(matches!(registry.resolve(parent_id), Resolved::Present(_)));

        registry.cancel("parent");
        match registry.resolve(parent_id) {
            Resolved::Finished(snap) => assert_eq!(snap.status.kind(), StatusKind::Canceled),
            other => panic!("unexpected {other:?}"),
        }

        let anon = waits_for_cancel();
        registry.track(anon.clone(), None);
        anon.cancel();
        assert!(matches!(registry.resolve(anon.id()), Resolved::Unknown));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_are_never_lost() {
        let registry = TaskRegistry::default();
        let mut tasks = Vec::new();
        for i in 0..64u64 {
            let task = OperationTask::new(move |ctx: TaskContext| async move {
                tokio::time::sleep(Duration::from_millis(i % 5)).await;
                if i % 3 == 0 {
                    ctx.cancelled().await;
                }
                Ok::<_, TaskError>(i)
            });
            registry.run(task.clone(), Some(format!("t{i}").as_str()));
            tasks.push(task);
        }

        let reg = registry.clone();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            reg.cancel_all()
        });
        for t in &tasks {
            t.join().await;
        }
        canceller.await.unwrap();

        assert!(registry.is_empty());
        for (i, t) in tasks.iter().enumerate() {
            let ident = format!("t{i}");
            let last = registry.last_status(&ident).map(|s| s.kind());
            assert_eq!(last, Some(t.status().kind()), "{ident}");
            assert_eq!(registry.history(&ident).len(), 1);
        }
    }

    #[tokio::test]
    async fn test_history_limit_applies_per_identifier() {
        let cfg = Config {
            history_limit: 2,
            ..Config::default()
        };
        let registry = TaskRegistry::new(cfg);
        for _ in 0..4 {
            let t = waits_for_cancel();
            registry.track(t.clone(), Some("capped"));
            t.cancel();
        }
        assert_eq!(registry.history("capped").len(), 2);
    }

    struct Recorder(Arc<Mutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_registry_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let registry = TaskRegistry::builder(Config::default())
            .with_subscriber(Recorder(seen.clone()))
            .build();

        let task = OperationTask::new(|_ctx| async { Ok::<_, TaskError>(()) });
        registry.run(task.clone(), None);
        task.join().await;

        for _ in 0..100 {
            if seen.lock().len() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(
            *seen.lock(),
            vec![
                EventKind::TaskTracked,
                EventKind::StatusChanged,
                EventKind::TaskEvicted
            ]
        );
    }

    #[tokio::test]
    async fn test_tasks_outlive_registry() {
        let registry = TaskRegistry::default();
        let task = waits_for_cancel();
        registry.run(task.clone(), Some("orphan"));
        drop(registry);

        task.cancel();
        assert_eq!(task.join().await, TaskStatus::Canceled);
    }
}
