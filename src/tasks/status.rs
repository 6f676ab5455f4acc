//! # Task status model.
//!
//! ```text
//!            start()            pause()
//!   Idle ──────────────► Active ◄──────► Paused
//!    │                   │  │  resume()    │
//!    │ cancel()          │  │ op Ok/Err    │ cancel()
//!    ▼                   │  ▼              ▼
//! Canceled ◄─────────────┘ Success(T) / Error(E)     Canceled
//! ```
//!
//! `Canceled`, `Success` and `Error` are terminal: no outgoing edges.

/// Fieldless projection of a status, used for transition checks, events and labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Idle,
    Active,
    Paused,
    Canceled,
    Success,
    Error,
}

impl StatusKind {
    /// Returns `true` for `Canceled`, `Success` and `Error`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusKind::Canceled | StatusKind::Success | StatusKind::Error
        )
    }

    /// Returns `true` if `self → to` is an edge of the task state machine.
    pub fn can_transition_to(&self, to: StatusKind) -> bool {
        use StatusKind::*;
        matches!(
            (self, to),
            (Idle, Active)
                | (Idle, Canceled)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Canceled)
                | (Paused, Canceled)
                | (Active, Success)
                | (Active, Error)
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StatusKind::Idle => "idle",
            StatusKind::Active => "active",
            StatusKind::Paused => "paused",
            StatusKind::Canceled => "canceled",
            StatusKind::Success => "success",
            StatusKind::Error => "error",
        }
    }
}

/// Current state of a task producing `T` on success and `E` on failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus<T, E> {
    /// Created, not started.
    Idle,
    /// Operation running.
    Active,
    /// Operation suspended by `pause()`.
    Paused,
    /// The caller withdrew (explicit or propagated cancellation).
    Canceled,
    /// The operation completed.
    Success(T),
    /// The operation failed.
    Error(E),
}

impl<T, E> TaskStatus<T, E> {
    /// Fieldless projection.
    pub fn kind(&self) -> StatusKind {
        match self {
            TaskStatus::Idle => StatusKind::Idle,
            TaskStatus::Active => StatusKind::Active,
            TaskStatus::Paused => StatusKind::Paused,
            TaskStatus::Canceled => StatusKind::Canceled,
            TaskStatus::Success(_) => StatusKind::Success,
            TaskStatus::Error(_) => StatusKind::Error,
        }
    }

    /// Returns `true` once the task can no longer change status.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Returns the success value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            TaskStatus::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            TaskStatus::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Maps payloads, preserving the state.
    pub fn map<U, F>(
        &self,
        on_success: impl FnOnce(&T) -> U,
        on_error: impl FnOnce(&E) -> F,
    ) -> TaskStatus<U, F> {
        match self {
            TaskStatus::Idle => TaskStatus::Idle,
            TaskStatus::Active => TaskStatus::Active,
            TaskStatus::Paused => TaskStatus::Paused,
            TaskStatus::Canceled => TaskStatus::Canceled,
            TaskStatus::Success(v) => TaskStatus::Success(on_success(v)),
            TaskStatus::Error(e) => TaskStatus::Error(on_error(e)),
        }
    }
}

/// Work done so far. `completed` only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Progress {
    /// Units completed.
    pub completed: u64,
    /// Total units, when known.
    pub total: Option<u64>,
}

impl Progress {
    /// Progress with a known total.
    pub fn of(completed: u64, total: u64) -> Self {
        Self {
            completed,
            total: Some(total),
        }
    }

    /// Progress as a count without a known total.
    pub fn units(completed: u64) -> Self {
        Self {
            completed,
            total: None,
        }
    }

    /// Completed fraction in `[0, 1]`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.completed as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [StatusKind; 6] = [
        StatusKind::Idle,
        StatusKind::Active,
        StatusKind::Paused,
        StatusKind::Canceled,
        StatusKind::Success,
        StatusKind::Error,
    ];

    #[test]
    fn test_terminal_states_have_no_edges() {
        for from in ALL.iter().filter(|k| k.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_edge_count_matches_table() {
        let edges = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (from, to)))
            .filter(|(from, to)| from.can_transition_to(**to))
            .count();
        assert_eq!(edges, 8);
        assert!(!StatusKind::Idle.can_transition_to(StatusKind::Success));
        assert!(!StatusKind::Paused.can_transition_to(StatusKind::Success));
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress::of(1, 4).fraction(), Some(0.25));
        assert_eq!(Progress::of(9, 4).fraction(), Some(1.0));
        assert_eq!(Progress::units(3).fraction(), None);
    }

    #[test]
    fn test_map_preserves_state() {
        let s: TaskStatus<u8, String> = TaskStatus::Success(2);
        assert_eq!(s.map(|v| *v as u32 * 10, |e| e.len()), TaskStatus::Success(20u32));
        let p: TaskStatus<u8, String> = TaskStatus::Paused;
        assert_eq!(p.map(|v| *v, |e| e.clone()).kind(), StatusKind::Paused);
    }
}
