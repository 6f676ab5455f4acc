//! # Blocking mutual-exclusion lock.
//!
//! [`Lock`] is a thin wrapper over [`parking_lot::RawMutex`] exposing an explicit
//! acquire/relinquish pair instead of a guard, plus a scoped helper that always releases.
//!
//! ## Rules
//! - `acquire_or_block()` parks the **thread** (no cooperative suspension).
//!   Use [`Semaphore::mutex`](crate::Semaphore::mutex) inside async code.
//! - Every successful acquisition is paired with exactly one `relinquish()` by the same owner.
//! - The lock is **not reentrant**: acquiring it twice from the same owner deadlocks.
//! - Relinquishing a lock that is not held, or that another thread holds, panics.
//!
//! ## Example
//! ```rust
//! use taskgraph::Lock;
//!
//! let lock = Lock::new();
//! let v = lock.with_critical_scope(|| 40 + 2);
//! assert_eq!(v, 42);
//!
//! lock.acquire_or_block();
//! assert!(lock.acquire_or_fail().is_err());
//! lock.relinquish();
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::lock_api::RawMutex as _;

use crate::error::SyncError;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Non-zero token identifying the calling thread.
fn thread_token() -> u64 {
    THREAD_TOKEN.with(|t| *t)
}

/// Blocking, non-reentrant mutual-exclusion lock.
///
/// Ownership belongs to the acquiring thread: only that thread may relinquish it.
pub struct Lock {
    raw: parking_lot::RawMutex,
    /// Token of the owning thread, `0` while unlocked.
    owner: AtomicU64,
}

impl Lock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        Self {
            raw: parking_lot::RawMutex::INIT,
            owner: AtomicU64::new(0),
        }
    }

    /// Blocks the calling thread until exclusive ownership is obtained.
    pub fn acquire_or_block(&self) {
        self.raw.lock();
        self.owner.store(thread_token(), Ordering::Relaxed);
    }

    /// Attempts to acquire without blocking.
    ///
    /// Returns [`SyncError::WouldBlock`] if the lock is already held.
    pub fn acquire_or_fail(&self) -> Result<(), SyncError> {
        if self.raw.try_lock() {
            self.owner.store(thread_token(), Ordering::Relaxed);
            Ok(())
        } else {
            Err(SyncError::WouldBlock)
        }
    }

    /// Releases ownership obtained by a previous acquisition.
    ///
    /// # Panics
    /// Panics if the lock is not currently held, or is held by another thread.
    pub fn relinquish(&self) {
        let owner = self.owner.load(Ordering::Relaxed);
        assert!(
            self.raw.is_locked() && owner != 0,
            "Lock::relinquish called on a lock that is not held"
        );
        assert!(
            owner == thread_token(),
            "Lock::relinquish called by a thread that does not own the lock"
        );
        self.owner.store(0, Ordering::Relaxed);
        // SAFETY: the lock is held and the calling thread is the one that acquired it.
        unsafe { self.raw.unlock() };
    }

    /// Returns `true` if some owner currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Acquires, runs `body`, and releases on every exit path (including unwinding).
    pub fn with_critical_scope<R>(&self, body: impl FnOnce() -> R) -> R {
        self.acquire_or_block();
        let _release = Release(self);
        body()
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Releases the lock when dropped.
struct Release<'a>(&'a Lock);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.relinquish();
    }
}
