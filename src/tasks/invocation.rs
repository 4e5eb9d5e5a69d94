//! # Task invocation record.
//!
//! [`TaskInvocation`] is one request to execute a task type with specific
//! arguments. It is created at submission and immutable from then on, except
//! that scheduling a retry produces a copy with the retry counter advanced.
//!
//! ## Ownership
//! The broker queue owns an invocation until a worker claims it; ownership
//! then transfers to that worker for the duration of one attempt. No two
//! workers ever hold the same invocation concurrently.
//!
//! ## Attempt counting
//! `attempt_count` counts **completed retries**: it is 0 for an invocation
//! that has not been retried, and [`TaskInvocation::attempt`] reports the
//! 1-based number of the attempt about to run (or running). The first
//! execution is always attempt 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One request to execute a task type with specific arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInvocation {
    task_id: String,
    task_name: String,
    args: Vec<Value>,
    attempt_count: u32,
    created_at: DateTime<Utc>,
}

impl TaskInvocation {
    /// Creates a new invocation with a fresh task id and zero retries.
    pub fn new(task_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_name: task_name.into(),
            args,
            attempt_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Globally unique task id, generated at submission.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Task-type name, the key into the registry.
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Ordered, opaque invocation arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Number of completed retries (0 for the first execution).
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// 1-based number of the attempt this delivery represents.
    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt_count + 1
    }

    /// Submission timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the invocation to re-enqueue after a failed attempt, with the
    /// retry counter advanced.
    pub(crate) fn retried(mut self) -> Self {
        self.attempt_count += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_invocation_is_attempt_one() {
        let inv = TaskInvocation::new("add", vec![json!(4), json!(6)]);
        assert_eq!(inv.attempt_count(), 0);
        assert_eq!(inv.attempt(), 1);
        assert_eq!(inv.task_name(), "add");
        assert_eq!(inv.args(), [json!(4), json!(6)]);
    }

    #[test]
    fn test_retried_advances_attempt() {
        let inv = TaskInvocation::new("flaky", vec![]);
        let id = inv.task_id().to_string();
        let retried = inv.retried();
        assert_eq!(retried.task_id(), id, "retry keeps the task id");
        assert_eq!(retried.attempt_count(), 1);
        assert_eq!(retried.attempt(), 2);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TaskInvocation::new("add", vec![]);
        let b = TaskInvocation::new("add", vec![]);
        assert_ne!(a.task_id(), b.task_id());
    }
}
