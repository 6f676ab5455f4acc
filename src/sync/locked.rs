//! # Lock-guarded value with explicit accessors.
//!
//! [`Locked<T>`] pairs a value with a [`Lock`] and only exposes it through
//! `get` / `set` / `mutate`, each running inside the lock's critical scope.

use std::cell::UnsafeCell;
use std::fmt;

use crate::sync::Lock;

/// A value that is only ever touched inside a [`Lock`] critical scope.
///
/// # Example
/// ```rust
/// use taskgraph::Locked;
///
/// let counter = Locked::new(0u32);
/// counter.mutate(|c| *c += 1);
/// counter.set(counter.get() * 10);
/// assert_eq!(counter.get(), 10);
/// ```
pub struct Locked<T> {
    lock: Lock,
    value: UnsafeCell<T>,
}

// SAFETY: every access to `value` goes through `lock`, so at most one thread
// observes the inner value at a time.
unsafe impl<T: Send> Send for Locked<T> {}
unsafe impl<T: Send> Sync for Locked<T> {}

impl<T> Locked<T> {
    /// Wraps `value`.
    pub const fn new(value: T) -> Self {
        Self {
            lock: Lock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Runs `f` with exclusive access to the value and returns its result.
    ///
    /// `f` must not access this same `Locked` (the lock is not reentrant).
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.lock.with_critical_scope(|| {
            // SAFETY: the lock is held for the duration of `f`.
            let value = unsafe { &mut *self.value.get() };
            f(value)
        })
    }

    /// Replaces the value, returning the previous one.
    pub fn set(&self, value: T) -> T {
        self.mutate(|v| std::mem::replace(v, value))
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> Locked<T> {
    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.mutate(|v| v.clone())
    }
}

impl<T: Default> Default for Locked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Locked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.mutate(|v| f.debug_tuple("Locked").field(v).finish())
    }
}
