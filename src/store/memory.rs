//! # In-memory result store.
//!
//! [`MemoryStore`] keeps the latest [`TaskRecord`] per task id in an
//! `RwLock<HashMap>`; reads clone the whole record, so a snapshot is never
//! torn even while a writer is updating the same id.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;

use crate::events::TaskStatus;
use crate::store::{ResultStore, TaskRecord};

/// In-memory `task_id → TaskRecord` store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, TaskRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, TaskRecord>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, TaskRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultStore for MemoryStore {
    fn insert_pending(&self, record: TaskRecord) {
        let mut records = self.write();
        records.entry(record.task_id.clone()).or_insert(record);
    }

    fn transition(
        &self,
        task_id: &str,
        status: TaskStatus,
        attempt: u32,
        result: Option<Value>,
    ) -> bool {
        let mut records = self.write();
        let Some(record) = records.get_mut(task_id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        record.status = status;
        record.attempt = attempt;
        record.result = result;
        record.updated_at = Utc::now();
        true
    }

    fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.read().get(task_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskInvocation;
    use serde_json::json;

    fn pending(store: &MemoryStore, name: &str) -> String {
        let inv = TaskInvocation::new(name, vec![]);
        let id = inv.task_id().to_string();
        store.insert_pending(TaskRecord::pending(&inv));
        id
    }

    #[test]
    fn test_insert_then_get() {
        let store = MemoryStore::new();
        let id = pending(&store, "add");

        let record = store.get(&id).expect("entry exists");
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.attempt, 0);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_forward_transitions_apply() {
        let store = MemoryStore::new();
        let id = pending(&store, "add");

        assert!(store.transition(&id, TaskStatus::Started, 1, None));
        assert!(store.transition(&id, TaskStatus::Retry, 1, None));
        assert!(store.transition(&id, TaskStatus::Started, 2, None));
        assert!(store.transition(&id, TaskStatus::Success, 2, Some(json!(10))));

        let record = store.get(&id).expect("entry exists");
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.attempt, 2);
        assert_eq!(record.result, Some(json!(10)));
    }

    #[test]
    fn test_terminal_record_is_immutable() {
        let store = MemoryStore::new();
        let id = pending(&store, "add");
        assert!(store.transition(&id, TaskStatus::Started, 1, None));
        assert!(store.transition(&id, TaskStatus::Success, 1, Some(json!(10))));

        assert!(!store.transition(&id, TaskStatus::Failure, 2, None));
        assert!(!store.transition(&id, TaskStatus::Revoked, 2, None));

        let record = store.get(&id).expect("entry exists");
        assert_eq!(record.status, TaskStatus::Success);
        assert_eq!(record.result, Some(json!(10)));
    }

    #[test]
    fn test_insert_pending_never_regresses() {
        let store = MemoryStore::new();
        let inv = TaskInvocation::new("add", vec![]);
        let id = inv.task_id().to_string();
        store.insert_pending(TaskRecord::pending(&inv));
        assert!(store.transition(&id, TaskStatus::Started, 1, None));

        // A duplicate submission-side insert must not overwrite the claim.
        store.insert_pending(TaskRecord::pending(&inv));
        let record = store.get(&id).expect("entry exists");
        assert_eq!(record.status, TaskStatus::Started);
    }

    #[test]
    fn test_transition_unknown_id_is_refused() {
        let store = MemoryStore::new();
        assert!(!store.transition("ghost", TaskStatus::Started, 1, None));
    }
}
