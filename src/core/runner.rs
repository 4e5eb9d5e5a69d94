//! # Run a single attempt of a task invocation.
//!
//! Executes one attempt of a handler with optional timeout, panic isolation,
//! and cancellation.
//!
//! - **Execute ONE attempt** with a child cancellation token
//! - **Apply timeout** if the policy configures one (wraps execution in
//!   `tokio::time::timeout`; a timed-out attempt is a retryable failure)
//! - **Isolate panics**: a panicking handler becomes `TaskError::Fatal`
//!   instead of taking the worker down
//!
//! ## Cancellation semantics
//! The handler receives a **child token** and should exit cooperatively when
//! it fires. Independently, this function stops polling the attempt future
//! once the parent token fires, so even an uncooperative handler is abandoned
//! at its next await point. Tradeoff: resources the handler holds across that
//! await may leak; the engine accepts this instead of hard-terminating
//! threads.

use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{panic_message, TaskError};
use crate::tasks::{Handler, TaskInvocation};

/// Executes a single attempt of `invocation` against `handler`.
///
/// ### Flow
/// 1. Derive a child cancellation token from `cancel`
/// 2. Execute the handler with panic isolation and optional timeout
/// 3. Race the attempt against parent cancellation
///
/// Exactly one of the four [`TaskError`] shapes (or the success value) comes
/// back; the caller maps it onto the retry-or-fail decision.
pub(crate) async fn run_attempt(
    handler: &dyn Handler,
    invocation: &TaskInvocation,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<serde_json::Value, TaskError> {
    let attempt_token = cancel.child_token();

    let isolated = {
        let fut = handler.run(invocation.args(), attempt_token.clone());
        async move {
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(panic_err) => Err(TaskError::Fatal {
                    error: panic_message(&*panic_err),
                }),
            }
        }
    };

    let guarded = async {
        if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
            match time::timeout(dur, isolated).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    attempt_token.cancel();
                    Err(TaskError::Timeout { timeout: dur })
                }
            }
        } else {
            isolated.await
        }
    };

    tokio::select! {
        res = guarded => res,
        _ = cancel.cancelled() => {
            attempt_token.cancel();
            Err(TaskError::Canceled)
        }
    }
}
