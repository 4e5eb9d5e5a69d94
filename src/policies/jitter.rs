//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] randomizes retry delays so that many invocations of the
//! same task type failing together do not all come back at the same instant.
//!
//! - [`JitterPolicy::None`] — the exact configured delay, every time
//! - [`JitterPolicy::Full`] — uniform in `[0, delay]` (most aggressive)
//! - [`JitterPolicy::Equal`] — uniform in `[delay/2, delay]` (balanced)

use rand::Rng;
use std::time::Duration;

/// Randomization applied to a retry delay.
///
/// `None` keeps retries predictable (good for tests and single tasks);
/// `Full` spreads load hardest but can shrink the delay to almost nothing;
/// `Equal` spreads load while keeping at least half the configured wait.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the exact retry delay.
    #[default]
    None,
    /// Uniform random delay in `[0, delay]`.
    Full,
    /// Half the delay, plus a uniform random half: `[delay/2, delay]`.
    Equal,
}

impl JitterPolicy {
    /// Applies this policy to the configured delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        if delay.is_zero() {
            return Duration::ZERO;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => delay.mul_f64(rand::rng().random::<f64>()),
            JitterPolicy::Equal => {
                let half = delay / 2;
                half + half.mul_f64(rand::rng().random::<f64>())
            }
        }
    }
}
