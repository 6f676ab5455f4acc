//! Registry maps and their bookkeeping rules, without locking.
//!
//! Every method is one serialized mutation or read of the maps; the caller holds the
//! registry lock and publishes the returned [`Event`] before releasing it.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use crate::events::{Event, EventKind};
use crate::registry::element::{RegistryElement, Resolved, StatusSnapshot};
use crate::tasks::{AnyStatus, AnyTask, TaskId, TaskStatus};

pub(super) struct LiveEntry {
    pub(super) task: AnyTask,
    pub(super) identifier: Option<Arc<str>>,
    pub(super) status: AnyStatus,
}

pub(super) struct Tables {
    live: HashMap<TaskId, LiveEntry>,
    /// Live tasks per identifier, oldest first. The last one is the forward index.
    by_identifier: HashMap<Arc<str>, Vec<TaskId>>,
    history: HashMap<Arc<str>, VecDeque<StatusSnapshot>>,
    /// Evicted tasks still present in `history`.
    finished: HashMap<TaskId, Arc<str>>,
    history_cap: Option<usize>,
}

impl Tables {
    pub(super) fn new(history_cap: Option<usize>) -> Self {
        Self {
            live: HashMap::new(),
            by_identifier: HashMap::new(),
            history: HashMap::new(),
            finished: HashMap::new(),
            history_cap,
        }
    }

    /// Adds a task to the live set. `None` if it is live or already recorded in history.
    pub(super) fn insert(
        &mut self,
        id: TaskId,
        task: AnyTask,
        identifier: Option<Arc<str>>,
        status: AnyStatus,
    ) -> Option<Event> {
        if self.live.contains_key(&id) || self.finished.contains_key(&id) {
            return None;
        }
        if let Some(ident) = &identifier {
            self.by_identifier.entry(ident.clone()).or_default().push(id);
        }
        let ev = Event::new(EventKind::TaskTracked)
            .with_task(id)
            .with_identifier_opt(identifier.clone())
            .with_status(status.kind());
        self.live.insert(
            id,
            LiveEntry {
                task,
                identifier,
                status,
            },
        );
        Some(ev)
    }

    /// Applies an observed status. Terminal statuses move the task into history.
    pub(super) fn update(&mut self, id: TaskId, status: &AnyStatus) -> Option<Event> {
        let entry = self.live.get_mut(&id)?;
        if !status.is_terminal() {
            if entry.status.kind() == status.kind() {
                return None;
            }
            entry.status = status.clone();
            return Some(
                Event::new(EventKind::StatusChanged)
                    .with_task(id)
                    .with_identifier_opt(entry.identifier.clone())
                    .with_status(status.kind()),
            );
        }

        let entry = self.live.remove(&id)?;
        if let Some(ident) = &entry.identifier {
            if let Some(stack) = self.by_identifier.get_mut(ident) {
                stack.retain(|t| *t != id);
                if stack.is_empty() {
                    self.by_identifier.remove(ident);
                }
            }

            let records = self.history.entry(ident.clone()).or_default();
            records.push_back(StatusSnapshot {
                task: id,
                status: status.clone(),
                at: SystemTime::now(),
            });
            self.finished.insert(id, ident.clone());
            if let Some(cap) = self.history_cap {
                while records.len() > cap {
                    if let Some(old) = records.pop_front() {
                        self.finished.remove(&old.task);
                    }
                }
            }
        }

        let mut ev = Event::new(EventKind::TaskEvicted)
            .with_task(id)
            .with_identifier_opt(entry.identifier)
            .with_status(status.kind());
        if let TaskStatus::Error(err) = status {
            ev = ev.with_reason(err.to_string());
        }
        Some(ev)
    }

    pub(super) fn lookup(&self, identifier: &str) -> Option<(TaskId, &LiveEntry)> {
        let id = *self.by_identifier.get(identifier)?.last()?;
        self.live.get(&id).map(|e| (id, e))
    }

    pub(super) fn last_status(&self, identifier: &str) -> Option<&StatusSnapshot> {
        self.history.get(identifier)?.back()
    }

    pub(super) fn history(&self, identifier: &str) -> Vec<StatusSnapshot> {
        self.history
            .get(identifier)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(super) fn live_tasks(&self) -> Vec<(TaskId, AnyTask, Option<Arc<str>>)> {
        self.live
            .iter()
            .map(|(id, e)| (*id, e.task.clone(), e.identifier.clone()))
            .collect()
    }

    pub(super) fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Named elements sorted by identifier, then anonymous live tasks by id.
    pub(super) fn elements(&self) -> Vec<RegistryElement> {
        let identifiers: BTreeSet<&Arc<str>> = self
            .by_identifier
            .keys()
            .chain(self.history.keys())
            .collect();

        let mut out = Vec::with_capacity(identifiers.len());
        for ident in identifiers {
            let history = self.history(ident);
            match self.lookup(ident) {
                Some((_, entry)) => out.push(RegistryElement::Live {
                    task: entry.task.clone(),
                    identifier: Some(ident.clone()),
                    status: entry.status.clone(),
                    history,
                }),
                None => out.push(RegistryElement::Tombstone {
                    identifier: ident.clone(),
                    history,
                }),
            }
        }

        let mut anonymous: Vec<(&TaskId, &LiveEntry)> = self
            .live
            .iter()
            .filter(|(_, e)| e.identifier.is_none())
            .collect();
        anonymous.sort_by_key(|(id, _)| **id);
        out.extend(anonymous.into_iter().map(|(_, e)| RegistryElement::Live {
            task: e.task.clone(),
            identifier: None,
            status: e.status.clone(),
            history: Vec::new(),
        }));
        out
    }

    pub(super) fn resolve(&self, id: TaskId) -> Resolved {
        if let Some(entry) = self.live.get(&id) {
            return Resolved::Present(entry.task.clone());
        }
        self.finished
            .get(&id)
            .and_then(|ident| self.history.get(ident))
            .and_then(|h| h.iter().rev().find(|s| s.task == id))
            .map(|s| Resolved::Finished(s.clone()))
            .unwrap_or(Resolved::Unknown)
    }
}
