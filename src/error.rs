//! Error types used by the taskflux engine and task handlers.
//!
//! Two enums with very different propagation rules:
//!
//! - [`EngineError`] — raised by the execution system itself and surfaced to
//!   whoever called the failing engine operation.
//! - [`TaskError`] — raised by one handler attempt; fully contained inside
//!   the worker's retry loop and only ever visible to the outside as a
//!   terminal `FAILURE` record.
//!
//! Both carry `as_label`/`as_message` helpers for logs and metrics, and
//! [`TaskError::is_retryable`] drives the retry-or-fail decision.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the taskflux engine.
///
/// Failures of the execution system, not of the business logic running
/// inside it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// The broker queue transport cannot be reached (or has been closed).
    ///
    /// Surfaced to the caller of `submit_task`; never retried internally —
    /// the producer decides whether to retry submission.
    #[error("broker unavailable: {reason}")]
    BrokerUnavailable {
        /// Transport-level detail (e.g. "queue closed").
        reason: String,
    },

    /// Submission referenced a task type that was never registered.
    ///
    /// Surfaced to the submitter immediately; the task is never enqueued.
    #[error("unknown task type: {task_name}")]
    UnknownTaskType {
        /// The unregistered task-type name.
        task_name: String,
    },

    /// Shutdown grace period ran out with attempts still in flight.
    #[error("shutdown grace {grace:?} exceeded; still running: {stuck:?}")]
    GraceExceeded {
        /// How long the engine waited.
        grace: Duration,
        /// Task ids whose attempts were abandoned.
        stuck: Vec<String>,
    },
}

impl EngineError {
    /// Stable snake_case label for this error, for log fields and metric tags.
    ///
    /// # Example
    /// ```
    /// use taskflux::EngineError;
    ///
    /// let err = EngineError::UnknownTaskType { task_name: "nope".into() };
    /// assert_eq!(err.as_label(), "unknown_task_type");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::BrokerUnavailable { .. } => "broker_unavailable",
            EngineError::UnknownTaskType { .. } => "unknown_task_type",
            EngineError::GraceExceeded { .. } => "grace_exceeded",
        }
    }

    /// Human-readable description, including the variant's details.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::BrokerUnavailable { reason } => format!("broker unavailable: {reason}"),
            EngineError::UnknownTaskType { task_name } => {
                format!("no handler registered for task type {task_name:?}")
            }
            EngineError::GraceExceeded { grace, stuck } => {
                format!("{} attempts still running after {grace:?}: {stuck:?}", stuck.len())
            }
        }
    }
}

/// # Errors produced by one handler attempt.
///
/// `Fail` and `Timeout` are retryable; `Fatal` skips any remaining retries;
/// `Canceled` means the attempt observed a revocation or shutdown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The attempt outlived its per-attempt timeout.
    #[error("attempt timed out after {timeout:?}")]
    Timeout {
        /// The exceeded timeout.
        timeout: Duration,
    },

    /// Non-recoverable handler error: remaining retries are skipped.
    #[error("non-retryable handler error: {error}")]
    Fatal {
        /// What went wrong.
        error: String,
    },

    /// The handler failed but a later attempt may succeed.
    #[error("handler failed: {error}")]
    Fail {
        /// What went wrong.
        error: String,
    },

    /// The attempt was cancelled before completing.
    #[error("attempt cancelled")]
    Canceled,
}

impl TaskError {
    /// Stable snake_case label for this error, for log fields and metric tags.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use taskflux::TaskError;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "handler_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "handler_timeout",
            TaskError::Fatal { .. } => "handler_fatal",
            TaskError::Fail { .. } => "handler_error",
            TaskError::Canceled => "handler_canceled",
        }
    }

    /// Human-readable description, including the variant's details.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timed out after {timeout:?}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Fail { error } => error.clone(),
            TaskError::Canceled => "cancelled".to_string(),
        }
    }

    /// Whether the worker may retry after this error.
    ///
    /// The worker checks this before consulting the retry policy: a
    /// non-retryable error goes straight to the terminal `FAILURE`.
    ///
    /// # Example
    /// ```
    /// use taskflux::TaskError;
    ///
    /// assert!(TaskError::Fail { error: "boom".into() }.is_retryable());
    /// assert!(!TaskError::Fatal { error: "nope".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Timeout { .. })
    }
}

/// Extracts a printable message from a caught panic payload.
///
/// Used wherever the engine contains a panic (handler attempts, subscriber
/// workers) instead of letting it take the worker down.
pub(crate) fn panic_message(panic_err: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
