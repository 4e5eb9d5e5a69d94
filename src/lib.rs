//! # taskflux
//!
//! **Taskflux** is an asynchronous task execution engine for Rust: submitted
//! work is queued through a broker, executed by a worker pool with
//! retry-aware state transitions, recorded in a result store, and every state
//! change is broadcast live to connected observers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  submit_task("add", [4, 6])          revoke_task(id)        get_status(id)
//!         │                                  │                      │
//!         ▼                                  ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  TaskEngine (facade)                                                  │
//! │  - TaskRegistry (name → handler + RetryPolicy, read-only)             │
//! │  - Broker (FIFO queue, delayed re-delivery, revocation)               │
//! │  - ResultStore (task_id → latest snapshot, forward-only)              │
//! │  - Bus (broadcast events)                                             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐      ┌──────────┐      ┌──────────┐
//!   │ Worker 1 │      │ Worker 2 │      │ Worker N │   (claim → execute →
//!   └┬─────────┘      └┬─────────┘      └┬─────────┘    retry-or-finish)
//!    │ Publishes       │ Publishes       │ Publishes
//!    │ Events:         │ Events:         │ Events:
//!    │ - TaskStarted   │ - TaskRetrying  │ - TaskSucceeded
//!    │ - TaskFailed    │ - TaskRevoked   │ - ...
//!    ▼                 ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                        │
//! └──────────────┬──────────────────────────────────┬─────────────────────┘
//!                ▼                                  ▼
//!      ┌──────────────────┐               ┌──────────────────────┐
//!      │ engine listener  │               │ EventStream (per     │
//!      │ → SubscriberSet  │               │ observer, SSE frames)│
//!      └───┬──────────┬───┘               └──────────────────────┘
//!          ▼          ▼
//!     [queue S1]  [queue SN]      (bounded, drop + overflow report)
//!          ▼          ▼
//!     sub1.on_event  subN.on_event
//! ```
//!
//! ### Task lifecycle
//! ```text
//! submit ──► PENDING ──► STARTED ──┬─► SUCCESS            (terminal)
//!                ▲                 ├─► FAILURE            (terminal)
//!                │                 └─► RETRY ─ delay ─► STARTED ...
//! revoke ───► REVOKED (terminal, from any non-terminal state)
//!
//! Attempts are numbered from 1; a task type with max_retries = r executes
//! at most r + 1 times. Terminal records never change again.
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                     |
//! |-------------------|----------------------------------------------------------------------|----------------------------------------|
//! | **Submission**    | Enqueue work, query status, revoke non-terminal tasks.               | [`TaskEngine`]                         |
//! | **Handlers**      | Define task types as async, cancellable functions.                   | [`Handler`], [`HandlerFn`]             |
//! | **Policies**      | Configure retries, delays, timeouts, jitter per task type.           | [`RetryPolicy`], [`JitterPolicy`]      |
//! | **Transport**     | Pluggable queue and result-store seams with embedded defaults.       | [`Broker`], [`ResultStore`]            |
//! | **Streaming**     | Live per-observer status events as SSE frames.                       | [`EventStream`]                        |
//! | **Subscriber API**| Hook into engine events in-process (logging, metrics).               | [`Subscribe`]                          |
//! | **Errors**        | Typed errors for the engine and for handler execution.               | [`EngineError`], [`TaskError`]         |
//! | **Configuration** | Centralize runtime settings.                                         | [`EngineConfig`]                       |
//!
//! ## Optional features
//! - `logging` *(default)*: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use serde_json::{json, Value};
//! use taskflux::{EngineConfig, HandlerFn, RetryPolicy, TaskEngine, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
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
//!
//!     let mut stream = engine.open_event_stream();
//!     let task_id = engine.submit_task("add", vec![json!(4), json!(6)]).await?;
//!
//!     while let Ok(ev) = stream.recv().await {
//!         println!("{:?} {:?}", ev.kind, ev.result);
//!         if ev.task_id.as_deref() == Some(task_id.as_str()) && ev.status().is_some_and(|s| s.is_terminal()) {
//!             break;
//!         }
//!     }
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod broker;
mod core;
mod error;
mod events;
mod policies;
mod store;
mod stream;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use broker::{Broker, MemoryBroker};
pub use core::{
    wait_for_shutdown_signal, EngineBuilder, EngineConfig, RevokeOutcome, StatusSnapshot,
    TaskEngine,
};
pub use error::{EngineError, TaskError};
pub use events::{Bus, Event, EventKind, TaskStatus, WireEvent};
pub use policies::{JitterPolicy, RetryPolicy};
pub use store::{MemoryStore, ResultStore, TaskRecord};
pub use stream::{EventStream, StreamError};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Handler, HandlerFn, HandlerRef, TaskInvocation, TaskRegistry};

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
