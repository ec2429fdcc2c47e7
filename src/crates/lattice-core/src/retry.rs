//! Retry policy with exponential backoff and jitter.
//!
//! Transient failures from remote model backends (rate limits, service
//! unavailability, timeouts) are worth retrying; a [`RetryPolicy`] decides
//! how many attempts to make and how long to wait between them. Delays grow
//! exponentially from an initial interval up to a cap, with optional random
//! jitter so that concurrent callers do not retry in lockstep.
//!
//! # Examples
//!
//! ```
//! use lattice_core::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::new(5)
//!     .with_initial_interval(1.0)
//!     .with_backoff_factor(2.0)
//!     .with_max_interval(30.0)
//!     .with_jitter(false);
//!
//! // Delays: 1s, 2s, 4s, 8s, 16s for attempts 0 through 4.
//! assert_eq!(policy.calculate_delay(0).as_secs_f64(), 1.0);
//! assert_eq!(policy.calculate_delay(3).as_secs_f64(), 8.0);
//! assert!(policy.should_retry(4));
//! assert!(!policy.should_retry(5));
//! ```

use std::time::Duration;

use rand::Rng;

/// Configuration for retrying failed operations with exponential backoff.
///
/// An attempt counter starts at zero. `calculate_delay(n)` returns the wait
/// before retry number `n`, and `should_retry(n)` reports whether attempt
/// `n` is still within budget.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: usize,
    /// Delay before the first retry, in seconds.
    pub initial_interval: f64,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: f64,
    /// Upper bound on any single delay, in seconds.
    pub max_interval: f64,
    /// Whether to randomize delays to avoid thundering-herd retries.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default backoff
    /// parameters: 0.5s initial interval, doubling per attempt, capped at
    /// 128s, with jitter enabled.
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_interval: 0.5,
            backoff_factor: 2.0,
            max_interval: 128.0,
            jitter: true,
        }
    }

    /// Sets the delay before the first retry, in seconds.
    pub fn with_initial_interval(mut self, seconds: f64) -> Self {
        self.initial_interval = seconds;
        self
    }

    /// Sets the multiplier applied to the delay after each attempt.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the upper bound on any single delay, in seconds.
    pub fn with_max_interval(mut self, seconds: f64) -> Self {
        self.max_interval = seconds;
        self
    }

    /// Enables or disables delay randomization.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the delay to wait before the given attempt number.
    ///
    /// Attempts are numbered from zero. Attempts at or past the budget get
    /// a zero delay since no retry will happen. With jitter enabled the
    /// computed delay is scaled by a random factor in `0.5..=1.5`.
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt >= self.max_attempts {
            return Duration::from_secs(0);
        }

        let base = self.initial_interval * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_interval);

        let delay = if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.5);
            capped * factor
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }

    /// Reports whether the given attempt number is within the budget.
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    /// Three attempts with the standard backoff parameters.
    fn default() -> Self {
        Self::new(3)
    }
}
