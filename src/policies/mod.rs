//! Retry and backoff policies.
//!
//! This module groups the knobs that control **whether** a failed operation is
//! retried and **how long** to wait between attempts.
//!
//! ## Contents
//! - [`Backoff`]         pluggable `(attempt, initial) -> delay` function
//! - [`BackoffStrategy`] built-in constant / linear / exponential shapes
//! - [`JitterPolicy`]    randomization strategy to avoid thundering herd
//! - [`RetryPolicy`]     the retry loop itself (cap, hook, cancellation)
//!
//! ## Quick wiring
//! ```text
//! RetryPolicy { strategy: Backoff, initial, max_attempts, on_failure }
//!      └─► run(cancel, op):
//!           - op(attempt) until Ok
//!           - strategy.delay(attempt, initial) between attempts
//! ```
//!
//! ## Defaults
//! - `BackoffStrategy::default()` → exponential, factor 2.0, max 30s, no jitter.
//! - `JitterPolicy::None` by default; `Full` draws uniformly from `[0, delay]`.

mod backoff;
mod jitter;
mod retry;

pub use backoff::{Backoff, BackoffStrategy};
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
