//! # Status events emitted by the engine and its workers.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Task lifecycle events**: one per state transition of a task
//!   (started, retrying, succeeded, failed, revoked)
//! - **Runtime events**: engine-internal conditions (subscriber overflow,
//!   shutdown lifecycle) that never reach the external stream
//!
//! The [`Event`] struct carries the transition metadata: task id and name,
//! attempt number, result-or-error payload, retry delay.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Per task id, lifecycle events are emitted in transition
//! order (`STARTED → (RETRY → STARTED)* → SUCCESS|FAILURE|REVOKED`).
//!
//! ## Wire encoding
//! Task lifecycle events project into [`WireEvent`], the JSON object observers
//! receive: `{task_id, task_name, status, result, attempt}`. Runtime events
//! have no wire form ([`Event::wire`] returns `None`).
//!
//! ## Example
//! ```rust
//! use taskflux::{Event, EventKind, TaskStatus};
//!
//! let ev = Event::task(EventKind::TaskRetrying, "id-1", "demo-task")
//!     .with_attempt(2)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskRetrying);
//! assert_eq!(ev.status(), Some(TaskStatus::Retry));
//! assert_eq!(ev.task_name.as_deref(), Some("demo-task"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lifecycle status of a task, as stored and as sent on the wire.
///
/// `NotFound` is a query outcome only: it is returned by status lookups for
/// unknown ids and is never written to the result store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Enqueued, not yet claimed by a worker.
    Pending,
    /// Claimed by a worker, an attempt is executing.
    Started,
    /// An attempt failed; a re-delivery is scheduled.
    Retry,
    /// Terminal: the handler returned a value.
    Success,
    /// Terminal: retries exhausted (or fatal error); holds the error description.
    Failure,
    /// Terminal: cancelled before completing.
    Revoked,
    /// Query outcome for an unknown task id.
    NotFound,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transition occurs).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failure | TaskStatus::Revoked
        )
    }

    /// Stable wire spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Started => "STARTED",
            TaskStatus::Retry => "RETRY",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
            TaskStatus::Revoked => "REVOKED",
            TaskStatus::NotFound => "NOT_FOUND",
        }
    }
}

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// A worker claimed the invocation and is starting an attempt.
    ///
    /// Sets: `task_id`, `task_name`, `attempt` (1-based).
    TaskStarted,

    /// An attempt failed and a re-delivery was scheduled.
    ///
    /// Sets: `task_id`, `task_name`, `attempt` (the attempt that failed),
    /// `reason`, `delay`.
    TaskRetrying,

    /// Terminal success.
    ///
    /// Sets: `task_id`, `task_name`, `attempt`, `result` (handler return value).
    TaskSucceeded,

    /// Terminal failure (retries exhausted or fatal error).
    ///
    /// Sets: `task_id`, `task_name`, `attempt`, `result` (error description),
    /// `reason`.
    TaskFailed,

    /// Terminal revocation.
    ///
    /// Sets: `task_id`, `task_name`, `attempt` (last known attempt).
    TaskRevoked,

    // === Subscriber events ===
    /// An in-process subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name and cause).
    SubscriberOverflow,

    /// An in-process subscriber panicked during event processing.
    ///
    /// Sets: `reason` (panic message).
    SubscriberPanicked,

    // === Shutdown events ===
    /// Engine shutdown was requested.
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    ShutdownComplete,

    /// Grace period exceeded; some attempts were abandoned.
    GraceExceeded,
}

impl EventKind {
    /// Maps a task lifecycle kind to the status it announces.
    ///
    /// Runtime kinds return `None`; the streaming gateway uses this to filter
    /// what goes on the wire.
    pub fn status(&self) -> Option<TaskStatus> {
        match self {
            EventKind::TaskStarted => Some(TaskStatus::Started),
            EventKind::TaskRetrying => Some(TaskStatus::Retry),
            EventKind::TaskSucceeded => Some(TaskStatus::Success),
            EventKind::TaskFailed => Some(TaskStatus::Failure),
            EventKind::TaskRevoked => Some(TaskStatus::Revoked),
            _ => None,
        }
    }
}

/// One published state change, with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    /// Event classification.
    pub kind: EventKind,

    /// Task id, set on lifecycle events.
    pub task_id: Option<Arc<str>>,
    /// Task-type name, set on lifecycle events.
    pub task_name: Option<Arc<str>>,
    /// Attempt number (1-based).
    pub attempt: Option<u32>,
    /// Result payload: handler return value on success, error description on
    /// terminal failure.
    pub result: Option<Value>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Retry delay, set on [`EventKind::TaskRetrying`].
    pub delay: Option<Duration>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            kind,
            task_id: None,
            task_name: None,
            attempt: None,
            result: None,
            reason: None,
            delay: None,
        }
    }

    /// Creates a task-scoped lifecycle event.
    pub fn task(
        kind: EventKind,
        task_id: impl Into<Arc<str>>,
        task_name: impl Into<Arc<str>>,
    ) -> Self {
        let mut ev = Event::new(kind);
        ev.task_id = Some(task_id.into());
        ev.task_name = Some(task_name.into());
        ev
    }

    /// Attaches an attempt number (1-based).
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a result payload.
    #[inline]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a retry delay.
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// The status this event announces, if it is a task lifecycle event.
    #[inline]
    pub fn status(&self) -> Option<TaskStatus> {
        self.kind.status()
    }

    /// Projects the event into its wire form.
    ///
    /// Returns `None` for runtime events, which never reach observers.
    pub fn wire(&self) -> Option<WireEvent<'_>> {
        let status = self.kind.status()?;
        Some(WireEvent {
            task_id: self.task_id.as_deref().unwrap_or(""),
            task_name: self.task_name.as_deref().unwrap_or(""),
            status,
            result: self.result.as_ref(),
            attempt: self.attempt,
        })
    }
}

/// Wire form of a task lifecycle event.
///
/// Serializes to the JSON object observers receive on the event stream:
/// `{"task_id": ..., "task_name": ..., "status": ..., "result": ..., "attempt": ...}`
/// with `result` null for non-terminal transitions.
#[derive(Debug, Serialize)]
pub struct WireEvent<'a> {
    /// Unique task id.
    pub task_id: &'a str,
    /// Task-type name.
    pub task_name: &'a str,
    /// Announced status.
    pub status: TaskStatus,
    /// Result value (success) or error description (failure), if terminal.
    pub result: Option<&'a Value>,
    /// Attempt number (1-based).
    pub attempt: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TaskStarted);
        let b = Event::new(EventKind::TaskStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EventKind::TaskSucceeded.status(),
            Some(TaskStatus::Success)
        );
        assert_eq!(EventKind::TaskRetrying.status(), Some(TaskStatus::Retry));
        assert_eq!(EventKind::ShutdownRequested.status(), None);
        assert_eq!(EventKind::SubscriberOverflow.status(), None);
    }

    #[test]
    fn test_wire_projection() {
        let ev = Event::task(EventKind::TaskSucceeded, "id-1", "add")
            .with_attempt(1)
            .with_result(json!(10));
        let wire = ev.wire().expect("lifecycle event has wire form");
        let encoded = serde_json::to_value(&wire).expect("wire event serializes");
        assert_eq!(
            encoded,
            json!({
                "task_id": "id-1",
                "task_name": "add",
                "status": "SUCCESS",
                "result": 10,
                "attempt": 1,
            })
        );
    }

    #[test]
    fn test_runtime_events_have_no_wire_form() {
        assert!(Event::new(EventKind::ShutdownRequested).wire().is_none());
    }

    #[test]
    fn test_status_wire_spelling() {
        assert_eq!(
            serde_json::to_value(TaskStatus::NotFound).expect("status serializes"),
            json!("NOT_FOUND")
        );
        assert_eq!(TaskStatus::NotFound.as_str(), "NOT_FOUND");
        assert!(TaskStatus::Revoked.is_terminal());
        assert!(!TaskStatus::Retry.is_terminal());
    }
}
