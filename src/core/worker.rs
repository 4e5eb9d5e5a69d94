//! # Worker: claim → execute → retry-or-finish loop.
//!
//! Each worker is one executor of the pool. It runs this loop until the
//! broker drains on shutdown or the runtime token fires:
//!
//! ```text
//! loop {
//!   ├─► claim()                        (suspends until work is available)
//!   ├─► transition STARTED, attempt=n  (refused if already terminal → skip)
//!   ├─► publish TaskStarted
//!   ├─► run_attempt()                  (timeout, panic isolation, cancel)
//!   │       │
//!   │       ├─ Ok(value) ──► SUCCESS  + TaskSucceeded
//!   │       ├─ Canceled ───► REVOKED  + TaskRevoked   (unless shutting down)
//!   │       └─ Err(e):
//!   │            ├─ retryable && attempts left:
//!   │            │     RETRY + TaskRetrying + schedule_retry(delay)
//!   │            │     (timer-based; the worker claims other work meanwhile)
//!   │            └─ otherwise: FAILURE + TaskFailed
//!   └─ exit: claim() returns None (broker drained or runtime cancelled)
//! }
//! ```
//!
//! ## Rules
//! - One worker owns one invocation per attempt; per-task-id transitions are
//!   therefore sequential and totally ordered.
//! - A store transition that is refused (terminal record — a racing
//!   revocation won) suppresses both the execution and the event, so no
//!   events follow a terminal state.
//! - Attempt numbers are 1-based; a `TaskRetrying` event carries the number
//!   of the attempt that just failed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;
use crate::core::runner::run_attempt;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind, TaskStatus};
use crate::store::ResultStore;
use crate::tasks::{TaskInvocation, TaskRegistry};

/// Cancellation tokens of currently executing attempts, keyed by task id.
///
/// The engine cancels through this table when a `STARTED` task is revoked;
/// the shutdown path lists its keys as the stuck tasks.
#[derive(Default)]
pub(crate) struct RunningSet {
    inner: Mutex<HashMap<String, CancellationToken>>,
}

impl RunningSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, task_id: &str, token: CancellationToken) {
        self.lock().insert(task_id.to_string(), token);
    }

    fn remove(&self, task_id: &str) {
        self.lock().remove(task_id);
    }

    /// Cancels the attempt executing `task_id`, if any.
    pub(crate) fn cancel(&self, task_id: &str) -> bool {
        match self.lock().get(task_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Task ids with an attempt currently in flight.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

/// Shared dependencies of every worker in the pool.
pub(crate) struct WorkerContext {
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) store: Arc<dyn ResultStore>,
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) bus: Bus,
    pub(crate) running: Arc<RunningSet>,
}

/// One executor of the worker pool.
pub(crate) struct Worker {
    ctx: Arc<WorkerContext>,
    id: usize,
}

impl Worker {
    pub(crate) fn new(ctx: Arc<WorkerContext>, id: usize) -> Self {
        Self { ctx, id }
    }

    /// Runs the claim/execute loop until shutdown.
    pub(crate) async fn run(self, runtime_token: CancellationToken) {
        tracing::debug!(worker = self.id, "worker started");
        loop {
            if runtime_token.is_cancelled() {
                break;
            }
            let Some(invocation) = self.ctx.broker.claim(&runtime_token).await else {
                break;
            };
            self.execute(invocation, &runtime_token).await;
        }
        tracing::debug!(worker = self.id, "worker stopped");
    }

    /// Executes one claimed invocation through a full attempt.
    async fn execute(&self, invocation: TaskInvocation, runtime_token: &CancellationToken) {
        let ctx = &self.ctx;
        let task_id = invocation.task_id().to_string();
        let task_name = invocation.task_name().to_string();
        let attempt = invocation.attempt();

        let (handler, policy) = match ctx.registry.lookup(&task_name) {
            Ok(pair) => pair,
            Err(err) => {
                // Submission validates the registry, so a claimed invocation
                // with no handler means the transport delivered foreign data.
                tracing::error!(task_id = %task_id, task = %task_name, "claimed invocation has no handler");
                let reason = err.to_string();
                if ctx.store.transition(
                    &task_id,
                    TaskStatus::Failure,
                    attempt,
                    Some(Value::String(reason.clone())),
                ) {
                    ctx.bus.publish(
                        Event::task(EventKind::TaskFailed, task_id.as_str(), task_name.as_str())
                            .with_attempt(attempt)
                            .with_result(Value::String(reason.clone()))
                            .with_reason(reason),
                    );
                }
                return;
            }
        };

        let attempt_cancel = runtime_token.child_token();
        ctx.running.insert(&task_id, attempt_cancel.clone());

        if !ctx
            .store
            .transition(&task_id, TaskStatus::Started, attempt, None)
        {
            // Already terminal: revoked between enqueue and claim. The
            // handler never runs.
            ctx.running.remove(&task_id);
            tracing::debug!(task_id = %task_id, "claimed invocation already terminal; dropped");
            return;
        }
        ctx.bus.publish(
            Event::task(EventKind::TaskStarted, task_id.as_str(), task_name.as_str())
                .with_attempt(attempt),
        );

        let outcome = run_attempt(handler.as_ref(), &invocation, &attempt_cancel, policy.timeout).await;
        ctx.running.remove(&task_id);

        match outcome {
            Ok(value) => {
                if ctx.store.transition(
                    &task_id,
                    TaskStatus::Success,
                    attempt,
                    Some(value.clone()),
                ) {
                    ctx.bus.publish(
                        Event::task(
                            EventKind::TaskSucceeded,
                            task_id.as_str(),
                            task_name.as_str(),
                        )
                        .with_attempt(attempt)
                        .with_result(value),
                    );
                }
            }
            Err(TaskError::Canceled) => {
                if runtime_token.is_cancelled() {
                    // Shutdown interrupt, not a revocation: the record keeps
                    // its STARTED state, the process is going away.
                    tracing::debug!(task_id = %task_id, "attempt interrupted by shutdown");
                } else if ctx
                    .store
                    .transition(&task_id, TaskStatus::Revoked, attempt, None)
                {
                    ctx.bus.publish(
                        Event::task(EventKind::TaskRevoked, task_id.as_str(), task_name.as_str())
                            .with_attempt(attempt),
                    );
                }
            }
            Err(err) => {
                let retry = err.is_retryable() && policy.allows_retry(invocation.attempt_count());
                if retry {
                    let delay = policy.next_delay();
                    if ctx
                        .store
                        .transition(&task_id, TaskStatus::Retry, attempt, None)
                    {
                        ctx.bus.publish(
                            Event::task(
                                EventKind::TaskRetrying,
                                task_id.as_str(),
                                task_name.as_str(),
                            )
                            .with_attempt(attempt)
                            .with_reason(err.to_string())
                            .with_delay(delay),
                        );
                        ctx.broker.schedule_retry(invocation.retried(), delay).await;
                    }
                } else {
                    let reason = err.to_string();
                    if ctx.store.transition(
                        &task_id,
                        TaskStatus::Failure,
                        attempt,
                        Some(Value::String(reason.clone())),
                    ) {
                        ctx.bus.publish(
                            Event::task(
                                EventKind::TaskFailed,
                                task_id.as_str(),
                                task_name.as_str(),
                            )
                            .with_attempt(attempt)
                            .with_result(Value::String(reason.clone()))
                            .with_reason(reason),
                        );
                    }
                }
            }
        }
    }
}
