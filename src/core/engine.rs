//! # TaskEngine: the external face of the execution engine.
//!
//! The engine owns the injected broker, result store, registry, and event
//! bus; it spawns the worker pool and exposes the four boundary operations:
//!
//! - [`TaskEngine::submit_task`] — validate, record `PENDING`, enqueue
//! - [`TaskEngine::get_status`] — point-in-time result-store read
//! - [`TaskEngine::revoke_task`] — cancel a non-terminal task
//! - [`TaskEngine::open_event_stream`] — subscribe to live status events
//!
//! ## High-level architecture
//! ```text
//! submit_task ──► Broker ──► Worker 1..N ──► ResultStore
//!                               │
//!                               └─ publish(Event) ──► Bus ─┬─► listener ─► SubscriberSet
//!                                                          ├─► EventStream (observer 1)
//!                                                          └─► EventStream (observer M)
//! revoke_task ──► Broker.revoke / RunningSet.cancel / direct terminal mark
//! ```
//!
//! ## Shutdown path
//! ```text
//! shutdown():
//!   Bus.publish(ShutdownRequested)
//!   Broker.close()            → submits fail, claims drain
//!   runtime_token.cancel()    → workers abandon in-flight attempts
//!   join workers within grace:
//!     ├─ Ok       → Bus.publish(ShutdownComplete)
//!     └─ Timeout  → Bus.publish(GraceExceeded), Err(GraceExceeded{stuck})
//! ```
//!
//! ## Example
//! ```no_run
//! use serde_json::{json, Value};
//! use std::time::Duration;
//! use taskflux::{EngineConfig, HandlerFn, RetryPolicy, TaskEngine, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = TaskEngine::builder(EngineConfig::default())
//!         .register(
//!             "add",
//!             HandlerFn::arc(|args: Vec<Value>, _ctx| async move {
//!                 let x = args.first().and_then(Value::as_i64).unwrap_or(0);
//!                 let y = args.get(1).and_then(Value::as_i64).unwrap_or(0);
//!                 Ok::<_, TaskError>(Value::from(x + y))
//!             }),
//!             RetryPolicy::new(0, Duration::from_secs(5)),
//!         )
//!         .build();
//!
//!     engine.start();
//!     let task_id = engine.submit_task("add", vec![json!(4), json!(6)]).await?;
//!     println!("{:?}", engine.get_status(&task_id));
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;
use crate::core::config::EngineConfig;
use crate::core::worker::{RunningSet, Worker, WorkerContext};
use crate::core::EngineBuilder;
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind, TaskStatus};
use crate::store::{ResultStore, TaskRecord};
use crate::stream::EventStream;
use crate::tasks::{TaskInvocation, TaskRegistry};

/// Point-in-time view of one task, as returned by [`TaskEngine::get_status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// The queried task id.
    pub task_id: String,
    /// Current status; [`TaskStatus::NotFound`] for unknown ids.
    pub status: TaskStatus,
    /// Result value (success) or error description (failure), when terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Outcome of [`TaskEngine::revoke_task`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RevokeOutcome {
    /// Whether the revocation took effect (`false` if already terminal or
    /// unknown).
    pub revoked: bool,
    /// Status observed after the attempt to revoke.
    pub status: TaskStatus,
}

/// Asynchronous task execution engine.
///
/// Construct with [`TaskEngine::builder`], call [`start`](TaskEngine::start)
/// once from within a tokio runtime, and [`shutdown`](TaskEngine::shutdown)
/// when done.
pub struct TaskEngine {
    cfg: EngineConfig,
    broker: Arc<dyn Broker>,
    store: Arc<dyn ResultStore>,
    registry: Arc<TaskRegistry>,
    bus: Bus,
    subs: Arc<crate::subscribers::SubscriberSet>,
    running: Arc<RunningSet>,
    runtime_token: CancellationToken,
    workers: Mutex<Option<JoinSet<()>>>,
}

impl TaskEngine {
    /// Starts building an engine with the given configuration.
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: EngineConfig,
        broker: Arc<dyn Broker>,
        store: Arc<dyn ResultStore>,
        registry: Arc<TaskRegistry>,
        bus: Bus,
        subs: Arc<crate::subscribers::SubscriberSet>,
    ) -> Self {
        Self {
            cfg,
            broker,
            store,
            registry,
            bus,
            subs,
            running: Arc::new(RunningSet::new()),
            runtime_token: CancellationToken::new(),
            workers: Mutex::new(None),
        }
    }

    /// Spawns the bus listener and the worker pool.
    ///
    /// Must be called from within a tokio runtime. Calling it a second time
    /// is a no-op. Tasks may be submitted before `start()`; they queue up and
    /// are claimed once the pool is running.
    pub fn start(&self) {
        let mut workers = self.lock_workers();
        if workers.is_some() {
            tracing::warn!("engine already started");
            return;
        }
        self.spawn_subscriber_listener();

        let ctx = Arc::new(WorkerContext {
            broker: Arc::clone(&self.broker),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            bus: self.bus.clone(),
            running: Arc::clone(&self.running),
        });
        let mut set = JoinSet::new();
        for id in 0..self.cfg.workers_clamped() {
            set.spawn(Worker::new(Arc::clone(&ctx), id).run(self.runtime_token.child_token()));
        }
        *workers = Some(set);
        tracing::debug!(workers = self.cfg.workers_clamped(), "engine started");
    }

    /// Enqueues a task invocation and returns its id immediately.
    ///
    /// Fails with [`EngineError::UnknownTaskType`] before anything is
    /// enqueued, and with [`EngineError::BrokerUnavailable`] if the transport
    /// rejects the submission (in which case the caller decides whether to
    /// retry).
    pub async fn submit_task(
        &self,
        task_name: &str,
        args: Vec<Value>,
    ) -> Result<String, EngineError> {
        if !self.registry.contains(task_name) {
            return Err(EngineError::UnknownTaskType {
                task_name: task_name.to_string(),
            });
        }
        let invocation = TaskInvocation::new(task_name, args);
        let task_id = invocation.task_id().to_string();

        // Eager PENDING record: a worker may claim the invocation the moment
        // it is enqueued, and its STARTED transition needs an entry to land on.
        self.store.insert_pending(TaskRecord::pending(&invocation));

        if let Err(err) = self.broker.submit(invocation).await {
            // The task was never enqueued; settle the eager record so status
            // queries for this id stay well-defined.
            self.store.transition(
                &task_id,
                TaskStatus::Failure,
                0,
                Some(Value::String(err.to_string())),
            );
            return Err(err);
        }
        tracing::debug!(task_id = %task_id, task = task_name, "task submitted");
        Ok(task_id)
    }

    /// Point-in-time read of one task's status.
    ///
    /// Always returns a well-defined snapshot; unknown ids report
    /// [`TaskStatus::NotFound`].
    pub fn get_status(&self, task_id: &str) -> StatusSnapshot {
        match self.store.get(task_id) {
            Some(record) => StatusSnapshot {
                task_id: record.task_id,
                status: record.status,
                result: record.result,
            },
            None => StatusSnapshot {
                task_id: task_id.to_string(),
                status: TaskStatus::NotFound,
                result: None,
            },
        }
    }

    /// Requests cancellation of a task that has not reached a terminal state.
    ///
    /// - Not yet claimed (queued or waiting out a retry delay): removed from
    ///   the broker and marked `REVOKED`; the handler never runs.
    /// - Executing: the attempt's cancellation token fires and the owning
    ///   worker records the terminal `REVOKED` transition (best-effort — a
    ///   handler that finishes before noticing wins the race).
    /// - Already terminal or unknown: `revoked: false` with the observed
    ///   status.
    pub async fn revoke_task(&self, task_id: &str) -> RevokeOutcome {
        let Some(record) = self.store.get(task_id) else {
            return RevokeOutcome {
                revoked: false,
                status: TaskStatus::NotFound,
            };
        };
        if record.status.is_terminal() {
            return RevokeOutcome {
                revoked: false,
                status: record.status,
            };
        }

        if self.broker.revoke(task_id).await {
            self.mark_revoked(task_id, &record);
            return RevokeOutcome {
                revoked: true,
                status: TaskStatus::Revoked,
            };
        }

        if self.running.cancel(task_id) {
            return RevokeOutcome {
                revoked: true,
                status: TaskStatus::Revoked,
            };
        }

        // Claim-in-progress window: not in the broker, not yet in the running
        // table. The terminal mark wins the race — the worker's STARTED
        // transition is refused and the handler never runs.
        if self.mark_revoked(task_id, &record) {
            return RevokeOutcome {
                revoked: true,
                status: TaskStatus::Revoked,
            };
        }
        let status = self
            .store
            .get(task_id)
            .map(|r| r.status)
            .unwrap_or(TaskStatus::NotFound);
        RevokeOutcome {
            revoked: false,
            status,
        }
    }

    /// Opens a live event stream for one observer.
    ///
    /// The stream sees only events published after this call (no backlog) and
    /// stays open until the observer drops it, falls too far behind, or the
    /// engine shuts down.
    pub fn open_event_stream(&self) -> EventStream {
        EventStream::new(self.bus.subscribe())
    }

    /// Stops the engine: closes the broker, cancels the workers, and waits up
    /// to the configured grace period for the pool to exit.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.broker.close();
        self.runtime_token.cancel();

        let set = self.lock_workers().take();
        let Some(mut set) = set else {
            return Ok(());
        };

        let grace = self.cfg.grace;
        let drained = async {
            while set.join_next().await.is_some() {}
        };
        match tokio::time::timeout(grace, drained).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::ShutdownComplete));
                Ok(())
            }
            Err(_elapsed) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = self.running.snapshot();
                Err(EngineError::GraceExceeded { grace, stuck })
            }
        }
    }

    /// Marks a task terminally revoked and announces it.
    fn mark_revoked(&self, task_id: &str, record: &TaskRecord) -> bool {
        if !self
            .store
            .transition(task_id, TaskStatus::Revoked, record.attempt, None)
        {
            return false;
        }
        let mut ev = Event::task(EventKind::TaskRevoked, task_id, record.task_name.as_str());
        if record.attempt > 0 {
            ev = ev.with_attempt(record.attempt);
        }
        self.bus.publish(ev);
        true
    }

    /// Subscribes to the bus and forwards events to the in-process
    /// subscriber set (fire-and-forget).
    fn spawn_subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                }
            }
        });
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Option<JoinSet<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::policies::RetryPolicy;
    use crate::tasks::{HandlerFn, HandlerRef};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn add_handler() -> HandlerRef {
        HandlerFn::arc(|args: Vec<Value>, _ctx| async move {
            let x = args.first().and_then(Value::as_i64).unwrap_or(0);
            let y = args.get(1).and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from(x + y))
        })
    }

    fn single_worker_config() -> EngineConfig {
        EngineConfig {
            workers: 1,
            ..EngineConfig::default()
        }
    }

    /// Receives events until one for `task_id` arrives.
    async fn next_for(stream: &mut EventStream, task_id: &str) -> Event {
        loop {
            let ev = stream.recv().await.expect("stream open");
            if ev.task_id.as_deref() == Some(task_id) {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn test_add_task_started_then_success() {
        let engine = TaskEngine::builder(single_worker_config())
            .register("add", add_handler(), RetryPolicy::new(0, Duration::from_millis(10)))
            .build();
        let mut stream = engine.open_event_stream();
        engine.start();

        let id = engine
            .submit_task("add", vec![json!(4), json!(6)])
            .await
            .expect("submitted");

        let started = next_for(&mut stream, &id).await;
        assert_eq!(started.kind, EventKind::TaskStarted);
        assert_eq!(started.attempt, Some(1));

        let done = next_for(&mut stream, &id).await;
        assert_eq!(done.kind, EventKind::TaskSucceeded);
        assert_eq!(done.attempt, Some(1));
        assert_eq!(done.result, Some(json!(10)));

        let snapshot = engine.get_status(&id);
        assert_eq!(snapshot.status, TaskStatus::Success);
        assert_eq!(snapshot.result, Some(json!(10)));

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_exhausts_into_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(move |_args: Vec<Value>, _ctx| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TaskError::Fail {
                        error: "boom".into(),
                    })
                }
            })
        };
        let engine = TaskEngine::builder(single_worker_config())
            .register("flaky", handler, RetryPolicy::new(2, Duration::from_millis(50)))
            .build();
        let mut stream = engine.open_event_stream();
        engine.start();

        let id = engine.submit_task("flaky", vec![]).await.expect("submitted");

        let expected = [
            (EventKind::TaskStarted, 1),
            (EventKind::TaskRetrying, 1),
            (EventKind::TaskStarted, 2),
            (EventKind::TaskRetrying, 2),
            (EventKind::TaskStarted, 3),
            (EventKind::TaskFailed, 3),
        ];
        for (kind, attempt) in expected {
            let ev = next_for(&mut stream, &id).await;
            assert_eq!((ev.kind, ev.attempt), (kind, Some(attempt)));
        }

        // max_retries = 2 → exactly three executions, never more.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let snapshot = engine.get_status(&id);
        assert_eq!(snapshot.status, TaskStatus::Failure);
        let description = snapshot.result.expect("failure holds error description");
        assert!(description.as_str().expect("description is a string").contains("boom"));

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_succeeds_after_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(move |_args: Vec<Value>, _ctx| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TaskError::Fail {
                            error: "first attempt fails".into(),
                        })
                    } else {
                        Ok(json!("recovered"))
                    }
                }
            })
        };
        let engine = TaskEngine::builder(single_worker_config())
            .register("unreliable", handler, RetryPolicy::new(1, Duration::from_secs(5)))
            .build();
        let mut stream = engine.open_event_stream();
        engine.start();

        let id = engine
            .submit_task("unreliable", vec![])
            .await
            .expect("submitted");

        let expected = [
            (EventKind::TaskStarted, 1),
            (EventKind::TaskRetrying, 1),
            (EventKind::TaskStarted, 2),
            (EventKind::TaskSucceeded, 2),
        ];
        for (kind, attempt) in expected {
            let ev = next_for(&mut stream, &id).await;
            assert_eq!((ev.kind, ev.attempt), (kind, Some(attempt)));
        }
        assert_eq!(engine.get_status(&id).status, TaskStatus::Success);

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_fifo_order_with_single_worker() {
        let order = Arc::new(Mutex::new(Vec::<i64>::new()));
        let handler = {
            let order = Arc::clone(&order);
            HandlerFn::arc(move |args: Vec<Value>, _ctx| {
                let order = Arc::clone(&order);
                async move {
                    let marker = args.first().and_then(Value::as_i64).unwrap_or(-1);
                    order
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(marker);
                    Ok(Value::Null)
                }
            })
        };
        let engine = TaskEngine::builder(single_worker_config())
            .register("ordered", handler, RetryPolicy::default())
            .build();
        let mut stream = engine.open_event_stream();

        // Both queued before any worker exists, so claim order is pure FIFO.
        let first = engine.submit_task("ordered", vec![json!(1)]).await.expect("submitted");
        let second = engine.submit_task("ordered", vec![json!(2)]).await.expect("submitted");
        engine.start();

        for id in [&first, &second] {
            loop {
                let ev = next_for(&mut stream, id).await;
                if ev.kind == EventKind::TaskSucceeded {
                    break;
                }
            }
        }
        let seen = order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        assert_eq!(seen, [1, 2]);

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_no_lost_claim_under_concurrency() {
        const TASKS: usize = 12;
        let calls = Arc::new(AtomicU32::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(move |_args: Vec<Value>, _ctx| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            })
        };
        let engine = TaskEngine::builder(EngineConfig {
            workers: 4,
            ..EngineConfig::default()
        })
        .register("count", handler, RetryPolicy::default())
        .build();
        let mut stream = engine.open_event_stream();
        engine.start();

        let mut submitted = std::collections::HashSet::new();
        for _ in 0..TASKS {
            submitted.insert(engine.submit_task("count", vec![]).await.expect("submitted"));
        }

        let mut finished = std::collections::HashSet::new();
        while finished.len() < TASKS {
            let ev = stream.recv().await.expect("stream open");
            if ev.kind == EventKind::TaskSucceeded {
                let id = ev.task_id.as_deref().expect("task event has id").to_string();
                assert!(finished.insert(id), "a task finished twice");
            }
        }

        assert_eq!(finished, submitted);
        assert_eq!(calls.load(Ordering::SeqCst), TASKS as u32);

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_revoke_before_claim_never_runs_handler() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(move |_args: Vec<Value>, _ctx| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            })
        };
        let engine = TaskEngine::builder(single_worker_config())
            .register("never", handler, RetryPolicy::default())
            .build();

        // No worker pool yet: the invocation sits unclaimed in the queue.
        let id = engine.submit_task("never", vec![]).await.expect("submitted");
        let outcome = engine.revoke_task(&id).await;
        assert!(outcome.revoked);
        assert_eq!(outcome.status, TaskStatus::Revoked);
        assert_eq!(engine.get_status(&id).status, TaskStatus::Revoked);

        engine.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must never run");

        let again = engine.revoke_task(&id).await;
        assert!(!again.revoked, "terminal task cannot be revoked twice");

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_revoke_running_task() {
        let handler = HandlerFn::arc(|_args: Vec<Value>, ctx| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let engine = TaskEngine::builder(single_worker_config())
            .register("stuck", handler, RetryPolicy::default())
            .build();
        let mut stream = engine.open_event_stream();
        engine.start();

        let id = engine.submit_task("stuck", vec![]).await.expect("submitted");
        let started = next_for(&mut stream, &id).await;
        assert_eq!(started.kind, EventKind::TaskStarted);

        let outcome = engine.revoke_task(&id).await;
        assert!(outcome.revoked);

        let revoked = next_for(&mut stream, &id).await;
        assert_eq!(revoked.kind, EventKind::TaskRevoked);
        assert_eq!(engine.get_status(&id).status, TaskStatus::Revoked);

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_no_replay_for_late_stream() {
        let engine = TaskEngine::builder(single_worker_config())
            .register("add", add_handler(), RetryPolicy::default())
            .build();
        let mut early = engine.open_event_stream();
        engine.start();

        let id = engine
            .submit_task("add", vec![json!(1), json!(2)])
            .await
            .expect("submitted");
        loop {
            if next_for(&mut early, &id).await.kind == EventKind::TaskSucceeded {
                break;
            }
        }

        let mut late = engine.open_event_stream();
        let outcome = tokio::time::timeout(Duration::from_millis(50), late.recv()).await;
        assert!(outcome.is_err(), "late observer must not see prior events");

        engine.shutdown().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_unknown_task_type_is_rejected() {
        let engine = TaskEngine::builder(EngineConfig::default()).build();
        let err = engine
            .submit_task("nope", vec![])
            .await
            .expect_err("unregistered type rejected");
        assert_eq!(err.as_label(), "unknown_task_type");
    }

    #[tokio::test]
    async fn test_status_of_unknown_id_is_not_found() {
        let engine = TaskEngine::builder(EngineConfig::default()).build();
        let snapshot = engine.get_status("no-such-id");
        assert_eq!(snapshot.status, TaskStatus::NotFound);
        assert!(snapshot.result.is_none());

        let outcome = engine.revoke_task("no-such-id").await;
        assert!(!outcome.revoked);
        assert_eq!(outcome.status, TaskStatus::NotFound);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_broker_unavailable() {
        let engine = TaskEngine::builder(EngineConfig::default())
            .register("add", add_handler(), RetryPolicy::default())
            .build();
        engine.start();
        engine.shutdown().await.expect("clean shutdown");

        let err = engine
            .submit_task("add", vec![json!(1), json!(2)])
            .await
            .expect_err("closed broker rejects submits");
        assert_eq!(err.as_label(), "broker_unavailable");
    }
}
