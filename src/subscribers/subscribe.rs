//! # The in-process subscriber trait
//!
//! `Subscribe` is how custom event handling plugs into the engine. The
//! [`SubscriberSet`](crate::SubscriberSet) owns a bounded queue and a worker
//! loop per subscriber, so an implementation is free to be slow (I/O,
//! batching) without ever holding up the publisher or its peers. The price of
//! falling behind is paid locally: once a subscriber's queue is full, its
//! events are dropped and each drop is announced with a `SubscriberOverflow`
//! event. [`Subscribe::queue_capacity`] sets that bound per subscriber.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for in-process event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative waits).
///
/// ## Example
/// ```rust
/// use async_trait::async_trait;
/// use taskflux::{Event, Subscribe};
///
/// struct Metrics;
///
/// #[async_trait]
/// impl Subscribe for Metrics {
///     async fn on_event(&self, _ev: &Event) {
///         // count transitions, export gauges...
///     }
///     fn name(&self) -> &'static str { "metrics" }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes one event.
    async fn on_event(&self, event: &Event);

    /// Name used when reporting this subscriber in logs and overflow events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// How many events this subscriber's queue may hold before drops begin.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
