//! # Counting semaphore with cooperative suspension.
//!
//! [`Semaphore`] admits at most `limit` concurrent holders. Callers beyond the limit
//! **suspend** (their future stays pending, no thread is parked) and are woken in FIFO order.
//!
//! ## Architecture
//! ```text
//! wait()   ──► holders < limit ? holders += 1 : enqueue oneshot ──► await
//! signal() ──► waiter queued   ? hand slot to oldest waiter        : holders -= 1
//! ```
//!
//! ## Rules
//! - A slot handed to a waiter is **transferred** (holder count unchanged).
//! - `signal()` without an outstanding holder is a programmer error and panics;
//!   `signal_or_fail()` reports it instead.
//! - A `wait()` future dropped after being granted a slot gives the slot back.
//! - `limit = 1` ([`Semaphore::mutex`]) is an async lock for cooperative code.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::SyncError;

struct State {
    holders: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Counting semaphore with FIFO, cooperatively-suspending `wait()`.
///
/// # Example
/// ```rust
/// use taskgraph::Semaphore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sem = Semaphore::new(2);
/// sem.wait().await;
/// assert_eq!(sem.available(), 1);
/// sem.signal();
///
/// let out = sem.with_critical_scope(async { "done" }).await;
/// assert_eq!(out, "done");
/// assert_eq!(sem.available(), 2);
/// # }
/// ```
pub struct Semaphore {
    limit: usize,
    state: Mutex<State>,
}

impl Semaphore {
    /// Creates a semaphore admitting `limit` concurrent holders.
    ///
    /// # Panics
    /// Panics if `limit == 0`.
    pub fn new(limit: usize) -> Self {
        assert!(limit >= 1, "Semaphore limit must be at least 1");
        Self {
            limit,
            state: Mutex::new(State {
                holders: 0,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Creates a `limit = 1` semaphore, usable as an async-suspending lock.
    pub fn mutex() -> Self {
        Self::new(1)
    }

    /// Configured number of concurrent holders.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of slots that can be taken right now without suspending.
    pub fn available(&self) -> usize {
        self.limit - self.state.lock().holders
    }

    /// Number of callers currently suspended in [`wait`](Self::wait).
    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .waiters
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Takes a slot, suspending until one is free.
    pub async fn wait(&self) {
        let rx = {
            let mut st = self.state.lock();
            if st.holders < self.limit {
                st.holders += 1;
                return;
            }
            let (tx, rx) = oneshot::channel();
            st.waiters.push_back(tx);
            rx
        };

        let mut pending = PendingWait {
            sem: self,
            rx: Some(rx),
        };
        if let Some(rx) = pending.rx.as_mut() {
            // Senders are only dropped unsent by a dropped semaphore, which `&self` rules out.
            let _ = rx.await;
        }
        pending.rx = None;
    }

    /// Takes a slot if one is free, otherwise fails with [`SyncError::WouldBlock`].
    pub fn wait_or_fail(&self) -> Result<(), SyncError> {
        let mut st = self.state.lock();
        if st.holders < self.limit {
            st.holders += 1;
            Ok(())
        } else {
            Err(SyncError::WouldBlock)
        }
    }

    /// Releases a slot: wakes the longest-waiting caller or frees the slot.
    ///
    /// # Panics
    /// Panics if there is no outstanding holder.
    pub fn signal(&self) {
        if let Err(e) = self.signal_or_fail() {
            panic!("Semaphore::signal without a holder: {e}");
        }
    }

    /// Like [`signal`](Self::signal), but reports [`SyncError::NoHolder`] instead of panicking.
    pub fn signal_or_fail(&self) -> Result<(), SyncError> {
        let mut st = self.state.lock();
        if st.holders == 0 {
            return Err(SyncError::NoHolder);
        }
        while let Some(tx) = st.waiters.pop_front() {
            if tx.send(()).is_ok() {
                return Ok(());
            }
        }
        st.holders -= 1;
        Ok(())
    }

    /// Takes a slot and returns a guard that signals when dropped.
    pub async fn acquire(&self) -> SemaphoreGuard<'_> {
        self.wait().await;
        SemaphoreGuard { sem: self }
    }

    /// Runs `body` while holding a slot; the slot is released on every exit path,
    /// including errors returned by `body` and the future being dropped.
    pub async fn with_critical_scope<F: Future>(&self, body: F) -> F::Output {
        let _guard = self.acquire().await;
        body.await
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("Semaphore")
            .field("limit", &self.limit)
            .field("holders", &st.holders)
            .field("waiters", &st.waiters.len())
            .finish()
    }
}

/// Held slot of a [`Semaphore`]; signals on drop.
#[must_use = "dropping the guard releases the slot immediately"]
pub struct SemaphoreGuard<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.sem.signal();
    }
}

/// Gives back a slot that was handed over after the waiting future was dropped.
struct PendingWait<'a> {
    sem: &'a Semaphore,
    rx: Option<oneshot::Receiver<()>>,
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.sem.signal();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn until(cond: impl Fn() -> bool) {
        while !cond() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_wait_or_fail_at_capacity() {
        let sem = Semaphore::new(1);
        assert_eq!(sem.wait_or_fail(), Ok(()));
        assert_eq!(sem.wait_or_fail(), Err(SyncError::WouldBlock));
        assert_eq!(sem.signal_or_fail(), Ok(()));
        assert_eq!(sem.signal_or_fail(), Err(SyncError::NoHolder));
    }

    #[test]
    #[should_panic(expected = "without a holder")]
    fn test_signal_without_holder_panics() {
        Semaphore::new(2).signal();
    }

    #[tokio::test]
    async fn test_waiters_released_in_fifo_order() {
        let sem = Arc::new(Semaphore::mutex());
        sem.wait().await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..3 {
            let worker = sem.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                worker.wait().await;
                let _ = tx.send(i);
            });
            let expected = i + 1;
            let probe = sem.clone();
            until(move || probe.waiting() == expected).await;
        }

        for expected in 0..3 {
            sem.signal();
            assert_eq!(rx.recv().await, Some(expected));
        }
        sem.signal();
        assert_eq!(sem.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_limit() {
        let sem = Arc::new(Semaphore::new(3));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut joins = Vec::new();
        for _ in 0..32 {
            let sem = sem.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            joins.push(tokio::spawn(async move {
                sem.with_critical_scope(async {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
            }));
        }
        for j in joins {
            j.await.unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
        assert_eq!(sem.available(), 3);
    }

    #[tokio::test]
    async fn test_critical_scope_releases_on_error() {
        let sem = Semaphore::new(1);
        let res: Result<(), &str> = sem.with_critical_scope(async { Err("boom") }).await;
        assert!(res.is_err());
        assert_eq!(sem.available(), 1);
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_skipped() {
        let sem = Semaphore::mutex();
        sem.wait().await;

        let mut fut = Box::pin(sem.wait());
        assert!(futures::poll!(&mut fut).is_pending());
        assert_eq!(sem.waiting(), 1);
        drop(fut);
        assert_eq!(sem.waiting(), 0);

        sem.signal();
        assert_eq!(sem.available(), 1);
    }

    #[tokio::test]
    async fn test_granted_then_dropped_waiter_returns_slot() {
        let sem = Semaphore::mutex();
        sem.wait().await;

        let mut fut = Box::pin(sem.wait());
        assert!(futures::poll!(&mut fut).is_pending());
        sem.signal();
        assert_eq!(sem.available(), 0);
        drop(fut);
        assert_eq!(sem.available(), 1);
    }
}
