//! # Result store: task id → latest lifecycle snapshot.
//!
//! The [`ResultStore`] trait is the second injected seam (next to the broker):
//! the in-memory [`MemoryStore`] serves embedded use and tests, and a durable
//! backend can implement the same contract for production.
//!
//! ## Contract
//! - [`ResultStore::insert_pending`] creates the entry at submission time;
//!   an existing entry is never replaced, so a racing first claim cannot be
//!   regressed to `PENDING`.
//! - [`ResultStore::transition`] applies last-write-wins updates guarded by
//!   the forward-only rule: a terminal record absorbs every later write and
//!   the method reports whether the write took effect. Only the worker
//!   currently holding an invocation writes its id (plus the engine when it
//!   marks a revocation), so per-id writes never interleave mid-attempt.
//! - [`ResultStore::get`] returns a consistent snapshot, safe to call
//!   concurrently with writes for the same id — the reader sees the old or
//!   the new record, never a partial one.
//! - Entries are never deleted by the engine; retention is an external policy.

mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::events::TaskStatus;
use crate::tasks::TaskInvocation;

pub use memory::MemoryStore;

/// Latest lifecycle snapshot of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// Unique task id.
    pub task_id: String,
    /// Task-type name.
    pub task_name: String,
    /// Latest status.
    pub status: TaskStatus,
    /// Attempt the record refers to (1-based; 0 while still `PENDING`).
    pub attempt: u32,
    /// Result value (success) or error description (failure), when terminal.
    pub result: Option<Value>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest transition.
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Creates the `PENDING` record for a freshly submitted invocation.
    pub fn pending(invocation: &TaskInvocation) -> Self {
        let now = Utc::now();
        Self {
            task_id: invocation.task_id().to_string(),
            task_name: invocation.task_name().to_string(),
            status: TaskStatus::Pending,
            attempt: 0,
            result: None,
            created_at: invocation.created_at(),
            updated_at: now,
        }
    }
}

/// Key-value store mapping task id to its latest lifecycle snapshot.
pub trait ResultStore: Send + Sync + 'static {
    /// Creates the entry for a newly submitted task.
    ///
    /// No-op if the id already has an entry (the entry may already have moved
    /// past `PENDING`).
    fn insert_pending(&self, record: TaskRecord);

    /// Applies a state transition to an existing entry.
    ///
    /// Returns `false` — leaving the entry untouched — when the id is unknown
    /// or the entry is already terminal.
    fn transition(
        &self,
        task_id: &str,
        status: TaskStatus,
        attempt: u32,
        result: Option<Value>,
    ) -> bool;

    /// Point-in-time snapshot of one entry.
    fn get(&self, task_id: &str) -> Option<TaskRecord>;
}
