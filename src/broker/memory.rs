//! # In-memory broker queue.
//!
//! [`MemoryBroker`] is the embedded transport: a mutex-guarded FIFO with a
//! [`Notify`]-based blocking claim and timer tasks for delayed re-delivery.
//!
//! ## Architecture
//! ```text
//! submit ──────────────► [ VecDeque ] ──► claim (notified wait, FIFO)
//!                              ▲
//! schedule_retry ─► timer ─────┘   (re-enqueue at expiry, unless revoked)
//!
//! revoke ─► drop from VecDeque, or cancel the timer token
//! ```
//!
//! ## Rules
//! - Claims are atomic: pop happens under the queue lock, so no two workers
//!   receive the same invocation.
//! - The lock is never held across an await point.
//! - No claim-acknowledgement or visibility timeout: workers live in the same
//!   process as the queue, so a worker cannot crash without the queue dying
//!   with it. A durable transport implementing [`Broker`] adds redelivery at
//!   this seam.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;
use crate::error::EngineError;
use crate::tasks::TaskInvocation;

/// Queue state guarded by one mutex; critical sections are short and sync.
struct State {
    queue: VecDeque<TaskInvocation>,
    /// Cancellation tokens of scheduled retries, keyed by task id.
    delayed: HashMap<String, CancellationToken>,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

/// Outcome of a non-blocking pop.
enum Pop {
    Item(TaskInvocation),
    Empty,
    Drained,
}

/// In-memory FIFO broker with delayed re-delivery and revocation.
#[derive(Clone)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    /// Creates an open, empty broker.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    delayed: HashMap::new(),
                    closed: false,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Number of immediately claimable invocations.
    pub fn len(&self) -> usize {
        self.lock_state().queue.len()
    }

    /// Whether the claimable queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_state().queue.is_empty()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        // Lock poisoning means a panic inside one of these short critical
        // sections; the queue data itself is still structurally sound.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_pop(&self) -> Pop {
        let mut state = self.lock_state();
        match state.queue.pop_front() {
            Some(inv) => Pop::Item(inv),
            None if state.closed => Pop::Drained,
            None => Pop::Empty,
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn submit(&self, invocation: TaskInvocation) -> Result<(), EngineError> {
        {
            let mut state = self.lock_state();
            if state.closed {
                return Err(EngineError::BrokerUnavailable {
                    reason: "queue closed".to_string(),
                });
            }
            state.queue.push_back(invocation);
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    async fn claim(&self, cancel: &CancellationToken) -> Option<TaskInvocation> {
        let notified = self.shared.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register interest before checking the queue, so a submit racing
            // with the check cannot slip between them unobserved.
            notified.as_mut().enable();
            match self.try_pop() {
                Pop::Item(inv) => return Some(inv),
                Pop::Drained => return None,
                Pop::Empty => {}
            }
            tokio::select! {
                _ = notified.as_mut() => {}
                _ = cancel.cancelled() => return None,
            }
            notified.set(self.shared.notify.notified());
        }
    }

    async fn schedule_retry(&self, invocation: TaskInvocation, delay: Duration) {
        let task_id = invocation.task_id().to_string();
        let token = CancellationToken::new();
        {
            let mut state = self.lock_state();
            if state.closed {
                tracing::debug!(task_id = %task_id, "broker closed; retry dropped");
                return;
            }
            state.delayed.insert(task_id.clone(), token.clone());
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {
                    // Revoked while waiting out the delay; the revoker already
                    // removed the map entry.
                    return;
                }
            }
            let mut state = shared
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.delayed.remove(&task_id);
            // The revocation check and the re-enqueue share one critical
            // section, so a racing revoke is fully ordered against it.
            if state.closed || token.is_cancelled() {
                return;
            }
            state.queue.push_back(invocation);
            drop(state);
            shared.notify.notify_one();
        });
    }

    async fn revoke(&self, task_id: &str) -> bool {
        let mut state = self.lock_state();
        let before = state.queue.len();
        state.queue.retain(|inv| inv.task_id() != task_id);
        if state.queue.len() != before {
            return true;
        }
        if let Some(token) = state.delayed.remove(task_id) {
            token.cancel();
            return true;
        }
        false
    }

    fn close(&self) {
        {
            let mut state = self.lock_state();
            state.closed = true;
            for token in state.delayed.values() {
                token.cancel();
            }
            state.delayed.clear();
        }
        self.shared.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(name: &str) -> TaskInvocation {
        TaskInvocation::new(name, vec![json!(1)])
    }

    #[tokio::test]
    async fn test_fifo_among_undelayed_items() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        let a = invocation("a");
        let b = invocation("b");
        let (a_id, b_id) = (a.task_id().to_string(), b.task_id().to_string());

        broker.submit(a).await.expect("submit a");
        broker.submit(b).await.expect("submit b");

        assert_eq!(broker.claim(&cancel).await.map(|i| i.task_id().to_string()), Some(a_id));
        assert_eq!(broker.claim(&cancel).await.map(|i| i.task_id().to_string()), Some(b_id));
    }

    #[tokio::test]
    async fn test_claim_suspends_until_submit() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();

        let claimer = {
            let broker = broker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { broker.claim(&cancel).await })
        };
        tokio::task::yield_now().await;

        broker.submit(invocation("late")).await.expect("submit");
        let claimed = claimer.await.expect("claimer ran");
        assert_eq!(claimed.map(|i| i.task_name().to_string()), Some("late".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_item_not_claimable_before_expiry() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        broker
            .schedule_retry(invocation("flaky"), Duration::from_secs(5))
            .await;

        let early = tokio::time::timeout(Duration::from_secs(1), broker.claim(&cancel)).await;
        assert!(early.is_err(), "item must not be claimable before its delay");

        let claimed = tokio::time::timeout(Duration::from_secs(10), broker.claim(&cancel))
            .await
            .expect("item claimable after delay");
        assert_eq!(claimed.map(|i| i.task_name().to_string()), Some("flaky".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_items_become_eligible_in_expiry_order() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        broker
            .schedule_retry(invocation("slow"), Duration::from_secs(10))
            .await;
        broker
            .schedule_retry(invocation("fast"), Duration::from_secs(1))
            .await;

        let first = broker.claim(&cancel).await.expect("first expiry");
        let second = broker.claim(&cancel).await.expect("second expiry");
        assert_eq!(first.task_name(), "fast");
        assert_eq!(second.task_name(), "slow");
    }

    #[tokio::test]
    async fn test_revoke_pending_item() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        let doomed = invocation("doomed");
        let doomed_id = doomed.task_id().to_string();
        broker.submit(doomed).await.expect("submit");
        broker.submit(invocation("kept")).await.expect("submit");

        assert!(broker.revoke(&doomed_id).await);
        let claimed = broker.claim(&cancel).await.expect("kept item claimable");
        assert_eq!(claimed.task_name(), "kept");
        assert!(!broker.revoke(&doomed_id).await, "second revoke finds nothing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_scheduled_retry_prevents_redelivery() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        let flaky = invocation("flaky");
        let flaky_id = flaky.task_id().to_string();
        broker.schedule_retry(flaky, Duration::from_secs(1)).await;

        assert!(broker.revoke(&flaky_id).await);
        let outcome = tokio::time::timeout(Duration::from_secs(5), broker.claim(&cancel)).await;
        assert!(outcome.is_err(), "revoked retry must never be delivered");
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let broker = MemoryBroker::new();
        broker.close();
        let err = broker
            .submit(invocation("late"))
            .await
            .expect_err("closed broker rejects submits");
        assert_eq!(err.as_label(), "broker_unavailable");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends_claims() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        broker.submit(invocation("last")).await.expect("submit");
        broker.close();

        assert!(broker.claim(&cancel).await.is_some(), "queued item drains");
        assert!(broker.claim(&cancel).await.is_none(), "then claims end");
    }

    #[tokio::test]
    async fn test_cancelled_claim_returns_none() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        let claimer = {
            let broker = broker.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { broker.claim(&cancel).await })
        };
        tokio::task::yield_now().await;
        cancel.cancel();
        assert!(claimer.await.expect("claimer ran").is_none());
    }
}
