//! # Handler abstraction.
//!
//! This module defines the [`Handler`] trait (async, cancelable) — the seam
//! between the engine and the business logic it executes. The common handle
//! type is [`HandlerRef`], an `Arc<dyn Handler>` suitable for sharing across
//! workers.
//!
//! A handler receives the invocation arguments and a [`CancellationToken`];
//! it should periodically check the token and return
//! [`TaskError::Canceled`](crate::TaskError::Canceled) promptly when a
//! revocation or shutdown is observed.
//!
//! Handlers may run more than once for the same invocation (retries, and
//! at-least-once delivery in general) — they must tolerate duplicate
//! execution or derive an idempotency key from their arguments.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Asynchronous, cancelable unit of business logic.
///
/// Arguments are an ordered sequence of opaque JSON values; the return value
/// is an opaque JSON value recorded as the task's result.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use tokio_util::sync::CancellationToken;
/// use taskflux::{Handler, TaskError};
///
/// struct Add;
///
/// #[async_trait]
/// impl Handler for Add {
///     async fn run(&self, args: &[Value], ctx: CancellationToken) -> Result<Value, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         let x = args.first().and_then(Value::as_i64).unwrap_or(0);
///         let y = args.get(1).and_then(Value::as_i64).unwrap_or(0);
///         Ok(Value::from(x + y))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Executes one attempt with the invocation's arguments.
    ///
    /// Implementations should check `ctx.is_cancelled()` at natural pause
    /// points and exit quickly to honor revocation and graceful shutdown.
    async fn run(&self, args: &[Value], ctx: CancellationToken) -> Result<Value, TaskError>;
}

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;
