//! # Global configuration.
//!
//! Provides [`Config`], centralized settings for the task registry and retry defaults.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `TaskRegistry::builder(config)`
//! 2. **Retry defaults**: `RetryPolicy::with_defaults(&config)`
//!
//! ## Sentinel values
//! - `history_limit = 0` → unbounded history per identifier
//! - `retry_max_attempts = None` → retry until success or cancellation

use std::time::Duration;

use crate::policies::BackoffStrategy;

/// Global configuration for the registry and retry defaults.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `history_limit`: Terminal statuses kept per identifier (`0` = unbounded)
/// - `retry_strategy`: Default backoff strategy for [`RetryPolicy`](crate::RetryPolicy)
/// - `retry_initial`: Default initial delay fed to the strategy
/// - `retry_max_attempts`: Default retry cap (`None` = no cap)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the registry event bus broadcast channel.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Maximum number of history entries retained per custom identifier.
    ///
    /// - `0` = unbounded (append-only for the registry's lifetime)
    /// - `n > 0` = oldest entries are dropped once `n` is exceeded
    pub history_limit: usize,

    /// Default backoff strategy for retries.
    pub retry_strategy: BackoffStrategy,

    /// Default initial delay passed to the backoff strategy.
    pub retry_initial: Duration,

    /// Default retry cap (retries after the first attempt).
    pub retry_max_attempts: Option<u32>,
}

impl Config {
    /// Returns the history cap as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` entries per identifier
    #[inline]
    pub fn history_cap(&self) -> Option<usize> {
        if self.history_limit == 0 {
            None
        } else {
            Some(self.history_limit)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `history_limit = 0` (unbounded)
    /// - `retry_strategy = Exponential { max: 30s, jitter: None }`
    /// - `retry_initial = 100ms`
    /// - `retry_max_attempts = Some(3)`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            history_limit: 0,
            retry_strategy: BackoffStrategy::default(),
            retry_initial: Duration::from_millis(100),
            retry_max_attempts: Some(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let mut cfg = Config::default();
        assert_eq!(cfg.history_cap(), None);
        cfg.history_limit = 4;
        assert_eq!(cfg.history_cap(), Some(4));

        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
