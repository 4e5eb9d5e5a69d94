//! # Retry policies.
//!
//! - [`RetryPolicy`] — per-task-type retry configuration (how many retries,
//!   how long to wait between them, optional per-attempt timeout).
//! - [`JitterPolicy`] — randomization of retry delays to prevent
//!   synchronized retries.
//!
//! Policies are immutable configuration, looked up by task type through the
//! registry and shared read-only by all workers.

mod jitter;
mod retry;

pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
