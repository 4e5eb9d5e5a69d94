//! # Broker queue: the transport between producers and workers.
//!
//! The [`Broker`] trait isolates the retry/state-machine logic from the
//! transport choice: the in-memory [`MemoryBroker`] serves embedded use and
//! tests, and a durable message queue can implement the same seam for
//! production without touching the worker pool.
//!
//! ## Contract
//! - [`Broker::submit`] enqueues at the tail; FIFO is guaranteed among items
//!   with no outstanding delay.
//! - [`Broker::claim`] removes and returns the head, or suspends the caller
//!   until an item is available (blocking wait, never busy-poll). No two
//!   callers ever receive the same invocation.
//! - [`Broker::schedule_retry`] makes an invocation claimable only after the
//!   delay elapses, without blocking other claims in the meantime; delayed
//!   items become eligible in delay-expiry order, not submission order.
//! - [`Broker::revoke`] removes a not-yet-claimed invocation (queued or
//!   delayed) so it is never delivered.
//! - A closed or unreachable transport fails `submit` with
//!   [`EngineError::BrokerUnavailable`]; the error is **not** retried
//!   internally — the producer decides whether to retry submission.

mod memory;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::tasks::TaskInvocation;

pub use memory::MemoryBroker;

/// Transport carrying serialized task invocations from producers to workers.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Enqueues an invocation at the tail of the queue.
    ///
    /// Fails with [`EngineError::BrokerUnavailable`] if the transport is
    /// closed or unreachable.
    async fn submit(&self, invocation: TaskInvocation) -> Result<(), EngineError>;

    /// Removes and returns the head of the queue, suspending until an item is
    /// available.
    ///
    /// Returns `None` when the broker is closed and drained, or when `cancel`
    /// fires — both mean the caller should stop claiming.
    async fn claim(&self, cancel: &CancellationToken) -> Option<TaskInvocation>;

    /// Re-enqueues an invocation after `delay`.
    ///
    /// The invocation is claimable only once the delay elapses; the call
    /// itself returns immediately. A broker that is already closed drops the
    /// invocation.
    async fn schedule_retry(&self, invocation: TaskInvocation, delay: Duration);

    /// Removes a not-yet-claimed invocation (queued, or waiting out a retry
    /// delay).
    ///
    /// Returns whether anything was cancelled. A claimed invocation is out of
    /// the broker's reach; revoking it is the worker pool's job.
    async fn revoke(&self, task_id: &str) -> bool;

    /// Closes the transport: subsequent submits fail, scheduled retries are
    /// dropped, and claimers drain the remaining queue before observing the
    /// close.
    fn close(&self);
}
