//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] gives every in-process subscriber its own bounded lane
//! and worker task, so emitting an event never waits on anyone:
//!
//! ```text
//! emit(event) ─┬─► [lane 1] ─► worker 1 ─► subscriber1.on_event()
//!              ├─► [lane 2] ─► worker 2 ─► subscriber2.on_event()
//!              └─► [lane N] ─► worker N ─► subscriberN.on_event()
//!                 (bounded)      └─ panic → SubscriberPanicked on the bus
//! ```
//!
//! ## Rules
//! - `emit()` uses `try_send` and returns immediately; a full or closed lane
//!   drops the event for that subscriber only and a `SubscriberOverflow`
//!   event is published in its place.
//! - Each subscriber sees its events in publish order; nothing is promised
//!   across subscribers (one may be on event N while another is on N+5).
//! - A panicking subscriber is caught per event and keeps running; reports
//!   about subscriber trouble are never re-reported when they themselves
//!   overflow, which would loop forever.
//! - `AssertUnwindSafe` is involved in the catch, so a subscriber that
//!   panics while holding shared state can leave that state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// One subscriber's bounded delivery lane.
struct Lane {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for in-process event subscribers.
///
/// Owns one lane and one worker task per subscriber; delivery to one
/// subscriber never blocks the publisher or the other subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set, one lane + worker per subscriber.
    ///
    /// Lane capacity comes from [`Subscribe::queue_capacity`] (minimum 1).
    /// Workers start immediately and run until [`shutdown`](Self::shutdown)
    /// closes their lanes.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut set = Self {
            lanes: Vec::with_capacity(subscribers.len()),
            workers: Vec::with_capacity(subscribers.len()),
            bus,
        };
        for subscriber in subscribers {
            set.attach(subscriber);
        }
        set
    }

    fn attach(&mut self, subscriber: Arc<dyn Subscribe>) {
        let capacity = subscriber.queue_capacity().max(1);
        let (tx, rx) = mpsc::channel::<Arc<Event>>(capacity);
        self.lanes.push(Lane {
            name: subscriber.name(),
            queue: tx,
        });
        self.workers
            .push(tokio::spawn(drive(subscriber, rx, self.bus.clone())));
    }

    /// Emits an event to all subscribers (clones it once into an `Arc`).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers, non-blocking.
    ///
    /// A lane that cannot take the event drops it; the drop is announced with
    /// a `SubscriberOverflow` event unless the dropped event was itself a
    /// subscriber-trouble report.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let reportable = !matches!(
            event.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        );

        for lane in &self.lanes {
            let dropped = match lane.queue.try_send(Arc::clone(&event)) {
                Ok(()) => None,
                Err(mpsc::error::TrySendError::Full(_)) => Some("full"),
                Err(mpsc::error::TrySendError::Closed(_)) => Some("closed"),
            };
            if let Some(cause) = dropped {
                if reportable {
                    self.bus.publish(Event::subscriber_overflow(lane.name, cause));
                }
            }
        }
    }

    /// Gracefully shuts down all subscriber workers: closes every lane, then
    /// waits for the workers to drain and exit.
    pub async fn shutdown(self) {
        drop(self.lanes);

        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Worker loop of one subscriber: drain the lane, isolate panics.
async fn drive(subscriber: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let attempt = std::panic::AssertUnwindSafe(subscriber.on_event(event.as_ref()))
            .catch_unwind()
            .await;
        if let Err(panic_err) = attempt {
            bus.publish(Event::subscriber_panicked(
                subscriber.name(),
                panic_message(&*panic_err),
            ));
        }
    }
}
