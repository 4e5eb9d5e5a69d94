//! # Global engine configuration.
//!
//! Provides [`EngineConfig`], centralized settings for the execution engine.
//!
//! Config is used in two ways:
//! 1. **Engine creation**: `TaskEngine::builder(config)`
//! 2. **Registration defaults**: `EngineBuilder::register_default` applies
//!    [`EngineConfig::default_retry`] to task types that don't bring their own
//!    policy.
//!
//! ## Sentinel values
//! - `workers = 0` → treated as 1 (there is always at least one executor)
//! - `bus_capacity = 0` → treated as 1 (clamped by the bus)

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Global configuration for the execution engine.
///
/// Defines:
/// - **Concurrency**: number of worker executors
/// - **Event system**: bus ring-buffer capacity
/// - **Task defaults**: retry policy for `register_default`
/// - **Shutdown behavior**: grace period for graceful termination
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of concurrent worker executors.
    ///
    /// Each worker claims and executes one invocation at a time; `n` workers
    /// give at most `n` attempts in flight. `0` is clamped to 1.
    pub workers: usize,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Subscribers that lag behind more than `bus_capacity` events skip the
    /// oldest items (stream observers are disconnected instead, see
    /// [`StreamError::Overloaded`](crate::StreamError::Overloaded)).
    /// Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,

    /// Default retry policy for task types registered without an explicit one.
    pub default_retry: RetryPolicy,

    /// Maximum time to wait for in-flight attempts during shutdown before
    /// abandoning them.
    ///
    /// When shutdown is requested:
    /// - The broker closes and workers are cancelled via `CancellationToken`
    /// - The engine waits up to `grace` for the pool to exit
    /// - On timeout it returns `EngineError::GraceExceeded`
    pub grace: Duration,
}

impl EngineConfig {
    /// Returns the worker count clamped to a minimum of 1.
    #[inline]
    pub fn workers_clamped(&self) -> usize {
        self.workers.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `workers = 4`
    /// - `bus_capacity = 1024`
    /// - `default_retry = RetryPolicy::default()` (run once, no retries)
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            workers: 4,
            bus_capacity: 1024,
            default_retry: RetryPolicy::default(),
            grace: Duration::from_secs(30),
        }
    }
}
