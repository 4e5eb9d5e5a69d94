//! # Retry policy for task types.
//!
//! [`RetryPolicy`] bundles everything the worker needs to decide what happens
//! after a failed attempt:
//! - [`RetryPolicy::max_retries`] — how many re-deliveries a failing
//!   invocation gets after its first attempt;
//! - [`RetryPolicy::retry_delay`] — how long the invocation waits before it
//!   becomes claimable again;
//! - [`RetryPolicy::timeout`] — optional per-attempt execution timeout;
//! - [`RetryPolicy::jitter`] — randomization applied to the delay.
//!
//! A task type with `max_retries = r` and an always-failing handler executes
//! exactly `r + 1` times before reaching a terminal `FAILURE`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use taskflux::RetryPolicy;
//!
//! let policy = RetryPolicy::new(1, Duration::from_secs(5));
//!
//! // attempt_count counts completed retries: 0 on the first execution.
//! assert!(policy.allows_retry(0));
//! assert!(!policy.allows_retry(1));
//! assert_eq!(policy.next_delay(), Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry configuration for one task type.
///
/// Immutable after registration; shared read-only by all workers.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of re-deliveries after the first attempt.
    ///
    /// `0` means the task runs once and never retries.
    pub max_retries: u32,
    /// Delay before a failed invocation becomes claimable again.
    pub retry_delay: Duration,
    /// Optional per-attempt execution timeout (`None` = no timeout).
    ///
    /// A timed-out attempt counts as a retryable failure.
    pub timeout: Option<Duration>,
    /// Jitter applied to `retry_delay`.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// Returns a policy with:
    /// - `max_retries = 0` (run once);
    /// - `retry_delay = 5s`;
    /// - `timeout = None`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::from_secs(5),
            timeout: None,
            jitter: JitterPolicy::None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry count and delay.
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            ..Self::default()
        }
    }

    /// Returns a new policy with the given per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a new policy with the given jitter.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether an invocation with `attempt_count` completed retries may be
    /// retried once more.
    ///
    /// `attempt_count` is 0 for an invocation that has only run its first
    /// attempt, so the comparison is against `max_retries` directly.
    #[inline]
    pub fn allows_retry(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_retries
    }

    /// Computes the delay before the next re-delivery, jitter applied.
    pub fn next_delay(&self) -> Duration {
        self.jitter.apply(self.retry_delay)
    }
}
