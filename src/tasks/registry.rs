//! # Task definition registry.
//!
//! [`TaskRegistry`] maps a task-type name to its executable handler and retry
//! policy. It is populated once while the engine is being built and read-only
//! thereafter, so lookups need no locking — the registry is shared behind an
//! `Arc` and every worker reads it concurrently.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::policies::RetryPolicy;
use crate::tasks::handler::HandlerRef;

/// A registered task type: its handler and retry policy.
struct Registration {
    handler: HandlerRef,
    policy: RetryPolicy,
}

/// Name → (handler, retry policy) registry, read-only after engine construction.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Registration>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Registers a task type.
    ///
    /// Re-registering a name replaces the previous entry; registration happens
    /// only before the engine starts, so there is no runtime re-registration.
    pub fn register(
        &mut self,
        task_name: impl Into<String>,
        handler: HandlerRef,
        policy: RetryPolicy,
    ) {
        self.tasks
            .insert(task_name.into(), Registration { handler, policy });
    }

    /// Looks up a task type, failing with [`EngineError::UnknownTaskType`] if absent.
    ///
    /// Returns cheap clones: the handler handle is an `Arc`, the policy is `Copy`.
    pub fn lookup(&self, task_name: &str) -> Result<(HandlerRef, RetryPolicy), EngineError> {
        self.tasks
            .get(task_name)
            .map(|reg| (reg.handler.clone(), reg.policy))
            .ok_or_else(|| EngineError::UnknownTaskType {
                task_name: task_name.to_string(),
            })
    }

    /// Whether a task type is registered.
    pub fn contains(&self, task_name: &str) -> bool {
        self.tasks.contains_key(task_name)
    }

    /// Returns sorted list of registered task-type names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered task types.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
