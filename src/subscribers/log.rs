//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders every event through `tracing`. Useful during
//! development and in the bundled demos; production embedders usually
//! implement their own [`Subscribe`] for structured export.
//!
//! ## Output (via `tracing`)
//! ```text
//! started task_id=… task=add attempt=1
//! retrying task_id=… task=flaky attempt=1 delay=5s reason="handler failed: boom"
//! failed task_id=… task=flaky attempt=2 reason="handler failed: boom"
//! succeeded task_id=… task=add attempt=1
//! revoked task_id=… task=long_running
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracing-backed logging subscriber.
///
/// Enabled via the `logging` feature.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates the subscriber.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task_id = e.task_id.as_deref().unwrap_or("-");
        let task = e.task_name.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskStarted => {
                tracing::info!(task_id, task, attempt = e.attempt, "started");
            }
            EventKind::TaskRetrying => {
                tracing::warn!(
                    task_id,
                    task,
                    attempt = e.attempt,
                    delay = ?e.delay,
                    reason = e.reason.as_deref(),
                    "retrying"
                );
            }
            EventKind::TaskSucceeded => {
                tracing::info!(task_id, task, attempt = e.attempt, "succeeded");
            }
            EventKind::TaskFailed => {
                tracing::error!(
                    task_id,
                    task,
                    attempt = e.attempt,
                    reason = e.reason.as_deref(),
                    "failed"
                );
            }
            EventKind::TaskRevoked => {
                tracing::info!(task_id, task, "revoked");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(reason = e.reason.as_deref(), "subscriber trouble");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::ShutdownComplete => {
                tracing::info!("all workers stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!("shutdown grace exceeded");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
