//! # Retry loop driven by a backoff strategy.
//!
//! [`RetryPolicy`] wraps an arbitrary fallible async operation and retries it until it
//! succeeds, the retry cap is exceeded, the failure hook aborts, or the surrounding
//! context is cancelled.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► cancelled?                 ─► RetryError::Canceled
//!   ├─► attempt += 1; op(attempt)
//!   │       ├─ Ok(v)               ─► return v
//!   │       └─ Err(e)
//!   │            ├─ attempt > max  ─► RetryError::Exhausted { max, last: e }
//!   │            ├─ cancelled?     ─► RetryError::Canceled
//!   │            ├─ on_failure(e, attempt) raised ─► RetryError::Aborted
//!   │            ├─ delay = strategy.delay(attempt, initial)
//!   │            ├─ cancelled?     ─► RetryError::Canceled
//!   │            └─ sleep(delay)   (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - `max_attempts = k` allows `k` **retries**, i.e. `k + 1` calls in total.
//! - The hook runs before each retry, never after success or on the final failure.
//! - Cancellation bypasses the hook and the remaining attempts.
//! - Retry is opt-in: tasks and the registry never retry on their own.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::RetryError;
use crate::policies::backoff::Backoff;

type FailureHook<E> = Arc<dyn Fn(&E, u32) -> Result<(), E> + Send + Sync>;

/// Retry configuration: strategy, initial delay, optional cap and failure hook.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use taskgraph::{BackoffStrategy, RetryError, RetryPolicy, TaskError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::<TaskError>::new(BackoffStrategy::Constant, Duration::from_millis(1))
///     .with_max_attempts(2);
///
/// let res: Result<(), _> = policy
///     .run(&CancellationToken::new(), |_attempt| async { Err(TaskError::fail("down")) })
///     .await;
///
/// assert!(matches!(res, Err(RetryError::Exhausted { max_attempts: 2, .. })));
/// # }
/// ```
pub struct RetryPolicy<E> {
    strategy: Arc<dyn Backoff>,
    initial: Duration,
    max_attempts: Option<u32>,
    on_failure: Option<FailureHook<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates an uncapped policy with the given strategy and initial delay.
    pub fn new(strategy: impl Backoff + 'static, initial: Duration) -> Self {
        Self {
            strategy: Arc::new(strategy),
            initial,
            max_attempts: None,
            on_failure: None,
        }
    }

    /// Creates a policy inheriting strategy, initial delay and cap from `cfg`.
    pub fn with_defaults(cfg: &Config) -> Self {
        Self {
            strategy: Arc::new(cfg.retry_strategy),
            initial: cfg.retry_initial,
            max_attempts: cfg.retry_max_attempts,
            on_failure: None,
        }
    }

    /// Caps the number of retries after the first attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Removes the retry cap.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Installs a hook invoked with `(error, attempt)` before each retry.
    ///
    /// Returning `Err` aborts the loop with [`RetryError::Aborted`].
    pub fn on_failure<H>(mut self, hook: H) -> Self
    where
        H: Fn(&E, u32) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    /// Returns the retry cap, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the initial delay fed to the strategy.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Delay the policy would wait after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.strategy.delay(attempt, self.initial)
    }

    /// Runs `op` until success or until the policy gives up.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Canceled);
            }
            attempt = attempt.saturating_add(1);

            let err = match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            if let Some(max_attempts) = self.max_attempts {
                if attempt > max_attempts {
                    return Err(RetryError::Exhausted {
                        max_attempts,
                        last: err,
                    });
                }
            }
            if cancel.is_cancelled() {
                return Err(RetryError::Canceled);
            }
            if let Some(hook) = &self.on_failure {
                hook(&err, attempt).map_err(RetryError::Aborted)?;
            }

            let delay = self.delay_for(attempt);
            if cancel.is_cancelled() {
                return Err(RetryError::Canceled);
            }
            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = cancel.cancelled() => return Err(RetryError::Canceled),
            }
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
            initial: self.initial,
            max_attempts: self.max_attempts,
            on_failure: self.on_failure.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("initial", &self.initial)
            .field("max_attempts", &self.max_attempts)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::policies::BackoffStrategy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn linear(initial: Duration) -> RetryPolicy<TaskError> {
        RetryPolicy::new(BackoffStrategy::Linear, initial)
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_makes_k_plus_one_attempts() {
        let calls = AtomicU32::new(0);
        let hooks = Arc::new(AtomicU32::new(0));
        let hooks_in = hooks.clone();
        let policy = linear(Duration::from_secs(1))
            .with_max_attempts(3)
            .on_failure(move |_e, _n| {
                hooks_in.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let started = Instant::now();
        let res: Result<(), _> = policy
            .run(&CancellationToken::new(), |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(TaskError::fail(format!("boom #{n}"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(hooks.load(Ordering::SeqCst), 3);
        assert_eq!(
            res,
            Err(RetryError::Exhausted {
                max_attempts: 3,
                last: TaskError::fail("boom #4"),
            })
        );
        // 1s + 2s + 3s of linear backoff.
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_attempt_j_stops_retrying() {
        let calls = AtomicU32::new(0);
        let hooks = Arc::new(AtomicU32::new(0));
        let hooks_in = hooks.clone();
        let policy = linear(Duration::from_millis(10))
            .with_max_attempts(5)
            .on_failure(move |_e, _n| {
                hooks_in.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let res = policy
            .run(&CancellationToken::new(), |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(TaskError::fail("not yet"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(res, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(hooks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_error_preempts_backoff() {
        let calls = AtomicU32::new(0);
        let policy = linear(Duration::from_secs(60))
            .on_failure(|e: &TaskError, _n| match e {
                TaskError::Fatal { .. } => Err(e.clone()),
                _ => Ok(()),
            });

        let started = Instant::now();
        let res: Result<(), _> = policy
            .run(&CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::fatal("disk gone")) }
            })
            .await;

        assert_eq!(res, Err(RetryError::Aborted(TaskError::fatal("disk gone"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_aborts() {
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let policy = linear(Duration::from_secs(10));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_secs(1)).await;
                token.cancel();
            })
        };

        let res: Result<(), _> = policy
            .run(&token, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TaskError::fail("x")) }
            })
            .await;
        canceller.await.unwrap();

        assert_eq!(res, Err(RetryError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let res: Result<(), _> = linear(Duration::ZERO)
            .run(&token, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(res, Err(RetryError::Canceled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_with_defaults_inherits_config() {
        let cfg = Config::default();
        let policy = RetryPolicy::<TaskError>::with_defaults(&cfg);
        assert_eq!(policy.max_attempts(), Some(3));
        assert_eq!(policy.initial(), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    }
}
