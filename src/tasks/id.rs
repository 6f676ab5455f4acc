use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter backing [`TaskId::next`].
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque identity that uniquely identifies a task within the process.
///
/// Assigned once at task creation and never reused. Ids are increasing but carry no
/// meaning beyond identity.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    /// Allocates a fresh identity.
    ///
    /// # Panics
    /// Panics if the 64-bit id space is exhausted.
    #[allow(clippy::new_without_default)]
    pub fn next() -> Self {
        let raw = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        match NonZeroU64::new(raw) {
            Some(v) => TaskId(v),
            None => panic!("task id counter overflowed"),
        }
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| TaskId::next()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
