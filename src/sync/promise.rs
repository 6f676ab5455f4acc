//! # Single-assignment future.
//!
//! [`AsyncPromise`] holds at most one `Result<T, E>`. It is fulfilled exactly once by a
//! producer and read any number of times by any number of consumers, before or after
//! fulfillment.
//!
//! ## Rules
//! - A second `fulfill` is a programmer error and panics (`try_fulfill` reports it instead).
//! - Consumers that arrive early suspend and are resolved in registration order.
//! - Every consumer observes the same value.
//! - Pending reads are not cancellable here; race `get()` against a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken) if needed.

use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::SyncError;

struct State<T, E> {
    value: Option<Result<T, E>>,
    waiters: Vec<oneshot::Sender<Result<T, E>>>,
}

/// Write-once, read-many asynchronous result container.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use taskgraph::AsyncPromise;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let promise: Arc<AsyncPromise<u32, String>> = Arc::new(AsyncPromise::new());
///
/// let reader = {
///     let p = promise.clone();
///     tokio::spawn(async move { p.get().await })
/// };
/// promise.succeed(42);
///
/// assert_eq!(reader.await.unwrap(), Ok(42));
/// assert_eq!(promise.get().await, Ok(42));
/// # }
/// ```
pub struct AsyncPromise<T, E> {
    state: Mutex<State<T, E>>,
}

impl<T, E> AsyncPromise<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Creates an empty promise.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                value: None,
                waiters: Vec::new(),
            }),
        }
    }

    /// Creates an already-fulfilled promise.
    pub fn fulfilled(result: Result<T, E>) -> Self {
        Self {
            state: Mutex::new(State {
                value: Some(result),
                waiters: Vec::new(),
            }),
        }
    }

    /// Stores `result` and resolves every waiting consumer.
    ///
    /// # Panics
    /// Panics if the promise was already fulfilled.
    pub fn fulfill(&self, result: Result<T, E>) {
        if self.try_fulfill(result).is_err() {
            panic!("AsyncPromise fulfilled twice");
        }
    }

    /// Like [`fulfill`](Self::fulfill), but reports [`SyncError::AlreadyFulfilled`]
    /// and leaves the stored value untouched.
    pub fn try_fulfill(&self, result: Result<T, E>) -> Result<(), SyncError> {
        let mut st = self.state.lock();
        if st.value.is_some() {
            return Err(SyncError::AlreadyFulfilled);
        }
        for tx in st.waiters.drain(..) {
            let _ = tx.send(result.clone());
        }
        st.value = Some(result);
        Ok(())
    }

    /// Fulfills with a success value.
    pub fn succeed(&self, value: T) {
        self.fulfill(Ok(value));
    }

    /// Fulfills with a failure value.
    pub fn fail(&self, error: E) {
        self.fulfill(Err(error));
    }

    /// Returns `true` once a value has been stored.
    pub fn is_fulfilled(&self) -> bool {
        self.state.lock().value.is_some()
    }

    /// Returns the stored value without waiting.
    pub fn try_get(&self) -> Option<Result<T, E>> {
        self.state.lock().value.clone()
    }

    /// Returns the stored value, suspending until the promise is fulfilled.
    pub async fn get(&self) -> Result<T, E> {
        let rx = {
            let mut st = self.state.lock();
            if let Some(v) = &st.value {
                return v.clone();
            }
            let (tx, rx) = oneshot::channel();
            // drop waiters whose `get` future was abandoned
            st.waiters.retain(|w| !w.is_closed());
            st.waiters.push(tx);
            rx
        };
        match rx.await {
            Ok(v) => v,
            Err(_) => unreachable!("promise waiters are only released by fulfillment"),
        }
    }
}

impl<T: Clone, E: Clone> Default for AsyncPromise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for AsyncPromise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("AsyncPromise")
            .field("value", &st.value)
            .field("waiters", &st.waiters.len())
            .finish()
    }
}
