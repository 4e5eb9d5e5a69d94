//! # Broadcast channel for status events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] into the engine's fan-out point:
//! workers and the engine publish, and every observer-side consumer (the
//! in-process subscriber listener, each [`EventStream`](crate::EventStream))
//! holds its own receiver.
//!
//! ```text
//!   Worker 1..N ──┐              ┌──► engine listener ──► SubscriberSet
//!   Engine      ──┴──► Bus ──────┼──► EventStream (observer 1)
//!                (ring buffer)   └──► EventStream (observer M)
//! ```
//!
//! ## Delivery semantics
//! - Publishing never blocks and never fails; with no receivers the event is
//!   simply gone.
//! - A receiver observes only events published after it subscribed — there is
//!   no replay or backlog for late joiners.
//! - The ring buffer is shared: when it wraps, a receiver that fell behind
//!   gets `RecvError::Lagged(n)` on its next `recv()` and loses the `n`
//!   oldest events. Publishers are never slowed down by a lagging receiver.

use tokio::sync::broadcast;

use super::event::Event;

/// Fan-out handle for status events.
///
/// Cheap to clone (the sender is `Arc`-backed); every component that needs to
/// publish or subscribe holds its own clone.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events (minimum 1,
    /// clamped).
    ///
    /// The capacity bounds how far any receiver may fall behind before it
    /// starts losing the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _first_rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to every current receiver.
    ///
    /// Never blocks; the channel clones the event per receiver.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Registers a new independent receiver.
    ///
    /// The receiver sees only events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(Event::task(EventKind::TaskStarted, "id-1", "demo"));

        let ev = rx.recv().await.expect("event delivered");
        assert_eq!(ev.kind, EventKind::TaskStarted);
        assert_eq!(ev.task_id.as_deref(), Some("id-1"));
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscriber() {
        let bus = Bus::new(16);
        bus.publish(Event::task(EventKind::TaskSucceeded, "id-1", "demo"));

        let mut rx = bus.subscribe();
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(20), rx.recv()).await;
        assert!(outcome.is_err(), "late subscriber must not see prior events");
    }

    #[tokio::test]
    async fn test_per_subscriber_receive_order() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        for attempt in 1..=3 {
            bus.publish(
                Event::task(EventKind::TaskStarted, "id-1", "demo").with_attempt(attempt),
            );
        }
        for attempt in 1..=3 {
            let ev = rx.recv().await.expect("event delivered");
            assert_eq!(ev.attempt, Some(attempt));
        }
    }
}
