//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Vec<Value>, CancellationToken) -> Fut`,
//! producing a fresh future per attempt. This avoids shared mutable state
//! between attempts; if shared state is needed, move an `Arc<...>` into the
//! closure explicitly.
//!
//! ## Example
//! ```rust
//! use serde_json::Value;
//! use tokio_util::sync::CancellationToken;
//! use taskflux::{HandlerFn, HandlerRef, TaskError};
//!
//! let add: HandlerRef = HandlerFn::arc(|args: Vec<Value>, _ctx: CancellationToken| async move {
//!     let x = args.first().and_then(Value::as_i64).unwrap_or(0);
//!     let y = args.get(1).and_then(Value::as_i64).unwrap_or(0);
//!     Ok::<_, TaskError>(Value::from(x + y))
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::handler::{Handler, HandlerRef};

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per attempt. The closure
/// receives an owned copy of the arguments, so the future it returns carries
/// no borrow of the invocation.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> HandlerFn<F>
where
    F: Fn(Vec<Value>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    /// Creates the handler and returns it as a shared handle (`Arc<dyn Handler>`).
    pub fn arc(f: F) -> HandlerRef {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Vec<Value>, CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    async fn run(&self, args: &[Value], ctx: CancellationToken) -> Result<Value, TaskError> {
        (self.f)(args.to_vec(), ctx).await
    }
}
