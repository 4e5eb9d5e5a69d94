//! # Engine builder.
//!
//! [`EngineBuilder`] wires the engine together from injected parts: broker,
//! result store, in-process subscribers, and the task registrations. Anything
//! not provided falls back to the embedded defaults ([`MemoryBroker`],
//! [`MemoryStore`](crate::MemoryStore)), so tests and single-process
//! deployments need no wiring at all.
//!
//! Registrations happen here because the registry is read-only once the
//! engine exists — there is no runtime re-registration.

use std::sync::Arc;

use crate::broker::{Broker, MemoryBroker};
use crate::core::config::EngineConfig;
use crate::core::engine::TaskEngine;
use crate::events::Bus;
use crate::policies::RetryPolicy;
use crate::store::{MemoryStore, ResultStore};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{HandlerRef, TaskRegistry};

/// Builder for constructing a [`TaskEngine`].
///
/// ## Example
/// ```no_run
/// use std::time::Duration;
/// use serde_json::Value;
/// use taskflux::{EngineConfig, HandlerFn, RetryPolicy, TaskEngine, TaskError};
///
/// let engine = TaskEngine::builder(EngineConfig::default())
///     .register(
///         "echo",
///         HandlerFn::arc(|args: Vec<Value>, _ctx| async move {
///             Ok::<_, TaskError>(Value::Array(args))
///         }),
///         RetryPolicy::new(1, Duration::from_secs(5)),
///     )
///     .build();
/// ```
pub struct EngineBuilder {
    cfg: EngineConfig,
    broker: Option<Arc<dyn Broker>>,
    store: Option<Arc<dyn ResultStore>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry: TaskRegistry,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub(crate) fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            broker: None,
            store: None,
            subscribers: Vec::new(),
            registry: TaskRegistry::new(),
        }
    }

    /// Sets the broker transport.
    ///
    /// Defaults to an in-memory queue; a durable message queue plugs in here
    /// without touching the worker pool.
    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Sets the result-store backend.
    ///
    /// Defaults to an in-memory store.
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets in-process event subscribers.
    ///
    /// Subscribers receive every engine event through dedicated workers with
    /// bounded queues; external observers use
    /// [`open_event_stream`](TaskEngine::open_event_stream) instead.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registers a task type with an explicit retry policy.
    pub fn register(
        mut self,
        task_name: impl Into<String>,
        handler: HandlerRef,
        policy: RetryPolicy,
    ) -> Self {
        self.registry.register(task_name, handler, policy);
        self
    }

    /// Registers a task type with the configuration's default retry policy.
    pub fn register_default(self, task_name: impl Into<String>, handler: HandlerRef) -> Self {
        let policy = self.cfg.default_retry;
        self.register(task_name, handler, policy)
    }

    /// Builds the engine.
    ///
    /// Must run within a tokio runtime: the subscriber workers are spawned
    /// here. The worker pool itself starts with
    /// [`TaskEngine::start`](TaskEngine::start).
    pub fn build(self) -> TaskEngine {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let broker = self
            .broker
            .unwrap_or_else(|| Arc::new(MemoryBroker::new()));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));

        TaskEngine::new_internal(
            self.cfg,
            broker,
            store,
            Arc::new(self.registry),
            bus,
            subs,
        )
    }
}
