//! # Backoff strategies for retrying operations.
//!
//! A backoff strategy is a pure function from `(attempt, initial)` to the wait before the
//! next attempt. [`Backoff`] is the pluggable seam; [`BackoffStrategy`] provides the
//! built-in shapes and any `Fn(u32, Duration) -> Duration` closure works too.
//!
//! Attempts are **1-based**: `attempt = 1` is the wait after the first failure.
//!
//! | Strategy      | delay(attempt, initial)                                  |
//! |---------------|----------------------------------------------------------|
//! | `Constant`    | `initial`                                                |
//! | `Linear`      | `initial × attempt`                                      |
//! | `Exponential` | `min(initial × factor^(attempt-1), max)`, then jitter    |
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskgraph::{Backoff, BackoffStrategy};
//!
//! let exp = BackoffStrategy::exponential(Duration::from_secs(3));
//! let initial = Duration::from_secs(1);
//!
//! assert_eq!(exp.delay(1, initial), Duration::from_secs(1));
//! assert_eq!(exp.delay(2, initial), Duration::from_secs(2));
//! // 4s capped at max=3s
//! assert_eq!(exp.delay(3, initial), Duration::from_secs(3));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Maps an attempt number and an initial delay to a wait duration.
pub trait Backoff: Send + Sync {
    /// Delay to wait after failed attempt `attempt` (1-based).
    fn delay(&self, attempt: u32, initial: Duration) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32, Duration) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32, initial: Duration) -> Duration {
        self(attempt, initial)
    }
}

/// Built-in backoff shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BackoffStrategy {
    /// Always wait `initial`.
    Constant,

    /// Wait `initial × attempt`.
    Linear,

    /// Wait `initial × factor^(attempt-1)`, capped at `max`, then jittered.
    Exponential {
        /// Multiplicative growth factor (`2.0` doubles each attempt).
        factor: f64,
        /// Maximum delay cap.
        max: Duration,
        /// Randomization applied to the capped delay.
        jitter: JitterPolicy,
    },
}

impl BackoffStrategy {
    /// Doubling exponential backoff capped at `max`, without jitter.
    pub fn exponential(max: Duration) -> Self {
        BackoffStrategy::Exponential {
            factor: 2.0,
            max,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with the given jitter (no effect on non-exponential strategies).
    pub fn with_jitter(self, jitter: JitterPolicy) -> Self {
        match self {
            BackoffStrategy::Exponential { factor, max, .. } => BackoffStrategy::Exponential {
                factor,
                max,
                jitter,
            },
            other => other,
        }
    }
}

impl Default for BackoffStrategy {
    /// Doubling exponential backoff capped at 30s, no jitter.
    fn default() -> Self {
        BackoffStrategy::exponential(Duration::from_secs(30))
    }
}

impl Backoff for BackoffStrategy {
    /// # Notes
    /// - `attempt = 0` is treated as `1`.
    /// - Overflowing or non-finite exponential values clamp to `max`.
    /// - Jitter is applied to the clamped base and never fed back into later attempts.
    fn delay(&self, attempt: u32, initial: Duration) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            BackoffStrategy::Constant => initial,
            BackoffStrategy::Linear => initial.saturating_mul(attempt),
            BackoffStrategy::Exponential {
                factor,
                max,
                jitter,
            } => {
                let max_secs = max.as_secs_f64();
                let exp = (attempt - 1).min(i32::MAX as u32) as i32;
                let unclamped_secs = initial.as_secs_f64() * factor.powi(exp);

                let base = if !unclamped_secs.is_finite()
                    || unclamped_secs < 0.0
                    || unclamped_secs > max_secs
                {
                    max
                } else {
                    Duration::from_secs_f64(unclamped_secs)
                };
                jitter.apply(base)
            }
        }
    }
}
