use std::sync::Arc;
use std::time::SystemTime;

use crate::tasks::{AnyStatus, AnyTask, TaskId};

/// A terminal status recorded in history.
#[derive(Clone, Debug)]
pub struct StatusSnapshot {
    /// Task that produced the status.
    pub task: TaskId,
    /// The terminal status.
    pub status: AnyStatus,
    /// Wall-clock time the registry observed it.
    pub at: SystemTime,
}

/// One element of [`TaskRegistry::snapshot`](crate::TaskRegistry::snapshot).
#[derive(Clone, Debug)]
pub enum RegistryElement {
    /// A task currently in the live set.
    Live {
        /// The task handle (identity via `task.id()`).
        task: AnyTask,
        /// Caller-supplied identifier, `None` for anonymous tasks.
        identifier: Option<Arc<str>>,
        /// Last status observed by the registry.
        status: AnyStatus,
        /// Terminal statuses already recorded under the identifier.
        history: Vec<StatusSnapshot>,
    },
    /// An identifier whose tasks have all finished: history only.
    Tombstone {
        /// The identifier.
        identifier: Arc<str>,
        /// Terminal statuses, oldest first.
        history: Vec<StatusSnapshot>,
    },
}

impl RegistryElement {
    /// Identifier of the element, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            RegistryElement::Live { identifier, .. } => identifier.as_deref(),
            RegistryElement::Tombstone { identifier, .. } => Some(identifier),
        }
    }

    /// History recorded under the element's identifier.
    pub fn history(&self) -> &[StatusSnapshot] {
        match self {
            RegistryElement::Live { history, .. } | RegistryElement::Tombstone { history, .. } => {
                history
            }
        }
    }

    /// Returns `true` for [`RegistryElement::Tombstone`].
    pub fn is_tombstone(&self) -> bool {
        matches!(self, RegistryElement::Tombstone { .. })
    }
}

/// Result of [`TaskRegistry::resolve`](crate::TaskRegistry::resolve).
#[derive(Clone, Debug)]
pub enum Resolved {
    /// The task is live.
    Present(AnyTask),
    /// The task finished; this is its recorded terminal status.
    Finished(StatusSnapshot),
    /// Never tracked, anonymous and finished, or dropped from bounded history.
    Unknown,
}
