//! Error types used by the task core and its synchronization primitives.
//!
//! This module defines the error enums returned across the crate:
//!
//! - [`SyncError`] - recoverable contention/capacity results of the `*_or_fail` primitives.
//! - [`TransitionError`] - a task rejected a pause/resume request.
//! - [`TaskError`] - default failure type for function-backed task operations.
//! - [`RetryError`] - outcome of a [`RetryPolicy`](crate::RetryPolicy) run that did not succeed.
//! - [`Canceled`] - marker returned by [`TaskContext::checkpoint`](crate::TaskContext::checkpoint).
//!
//! Each type provides `as_label` for logs/metrics. Programmer errors (double fulfillment,
//! unbalanced release, signal without a holder) are not represented here: they panic.

use std::time::Duration;
use thiserror::Error;

use crate::tasks::StatusKind;

/// # Recoverable failures of the non-suspending primitives.
///
/// Returned by [`Lock::acquire_or_fail`](crate::Lock::acquire_or_fail),
/// [`Semaphore::wait_or_fail`](crate::Semaphore::wait_or_fail),
/// [`Semaphore::signal_or_fail`](crate::Semaphore::signal_or_fail) and
/// [`AsyncPromise::try_fulfill`](crate::AsyncPromise::try_fulfill).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The primitive is already held (or at capacity) and the caller asked not to wait.
    #[error("operation would block")]
    WouldBlock,

    /// A release was requested but nothing currently holds the primitive.
    #[error("no outstanding holder to release")]
    NoHolder,

    /// The promise already holds a value.
    #[error("promise already fulfilled")]
    AlreadyFulfilled,
}

impl SyncError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgraph::SyncError;
    ///
    /// assert_eq!(SyncError::WouldBlock.as_label(), "sync_would_block");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::WouldBlock => "sync_would_block",
            SyncError::NoHolder => "sync_no_holder",
            SyncError::AlreadyFulfilled => "sync_already_fulfilled",
        }
    }
}

/// # A task refused a pause or resume request.
///
/// `start()` and `cancel()` never fail: they are ignored when not applicable.
/// Pause and resume report why they did nothing.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// This task kind does not implement pausing.
    #[error("{op} is not supported by this task")]
    Unsupported {
        /// The requested operation (`"pause"` or `"resume"`).
        op: &'static str,
    },

    /// The task is not in a state the operation applies to.
    #[error("cannot {op} a task in status {status:?}")]
    NotApplicable {
        /// The requested operation.
        op: &'static str,
        /// Status at the time of the request.
        status: StatusKind,
    },
}

impl TransitionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransitionError::Unsupported { .. } => "transition_unsupported",
            TransitionError::NotApplicable { .. } => "transition_not_applicable",
        }
    }
}

/// Marker error: the surrounding task was cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("task cancelled")]
pub struct Canceled;

/// # Errors produced by task operations.
///
/// Default error type for function-backed tasks. Some errors are retryable
/// (`Timeout`, `Fail`), others are not.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Operation exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable fatal error (should not be retried).
    #[error("fatal error (no retry): {reason}")]
    Fatal {
        /// The underlying error message.
        reason: String,
    },

    /// Operation failed but may succeed if retried.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Operation observed cancellation and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(reason: impl Into<String>) -> Self {
        TaskError::Fatal {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgraph::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`TaskError::Fail`] and [`TaskError::Timeout`],
    /// `false` otherwise. Cancellation is never retried.
    ///
    /// # Example
    /// ```
    /// use taskgraph::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// assert!(!TaskError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Timeout { .. })
    }
}

impl From<Canceled> for TaskError {
    fn from(_: Canceled) -> Self {
        TaskError::Canceled
    }
}

/// # Why a retry loop gave up.
///
/// Distinct from the operation's own error type so callers can tell
/// "retries ran out" apart from "the failure hook aborted" and "the caller withdrew".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every allowed retry failed. `last` is the error of the final attempt.
    #[error("retries exhausted after {max_attempts} retries: {last}")]
    Exhausted {
        /// The configured retry cap.
        max_attempts: u32,
        /// Error returned by the final attempt.
        last: E,
    },

    /// The failure hook raised; its error preempted the backoff.
    #[error("retry aborted by failure hook: {0}")]
    Aborted(E),

    /// The surrounding context was cancelled.
    #[error("retry cancelled")]
    Canceled,
}

impl<E> RetryError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryError::Exhausted { .. } => "retry_exhausted",
            RetryError::Aborted(_) => "retry_aborted",
            RetryError::Canceled => "retry_canceled",
        }
    }

    /// Returns the underlying operation error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Aborted(e) => Some(e),
            RetryError::Canceled => None,
        }
    }
}
