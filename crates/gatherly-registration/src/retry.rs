//! Retry policy for conditional-write conflicts.
//!
//! A commit that loses the revision race is retried after an exponentially
//! growing delay, up to a bounded number of attempts. The defaults are tuned
//! for per-event contention: conflicts resolve in a handful of milliseconds
//! because every conflict round has at least one winner.

use std::time::Duration;

/// Retry policy configuration for exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries; the first conflict surfaces immediately.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total number of attempts, counting the initial try.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Calculate the delay before the retry with the given index.
    ///
    /// Uses exponential backoff: delay = initial_delay * (multiplier ^ retry)
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, retry: usize) -> Duration {
        if retry == 0 {
            return self.initial_delay;
        }

        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let delay = Duration::from_millis(delay_ms as u64);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}
