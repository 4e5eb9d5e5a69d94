//! # Event stream handle and SSE encoding.
//!
//! One [`EventStream`] per connected observer:
//! - created by [`TaskEngine::open_event_stream`](crate::TaskEngine::open_event_stream),
//! - receives every task lifecycle event published after it was opened
//!   (no replay/backlog for late joiners),
//! - encodes each event as a self-contained `data: <JSON>\n\n` frame,
//! - ends only when the observer disconnects, the engine shuts down, or the
//!   observer falls too far behind.
//!
//! ## Slow consumers
//! The bus ring buffer drops the oldest events for a lagging receiver; an
//! `EventStream` that observes such a lag reports
//! [`StreamError::Overloaded`] once and then behaves as closed. One
//! overloaded observer never stalls publishing or its peers.
//!
//! ## Backpressure
//! [`EventStream::forward`] awaits the transport between frames, so a slow
//! client throttles only its own stream task.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::events::Event;

/// Why an event stream ended.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// The engine shut down (or the stream was already disconnected); the
    /// observer sees a clean end of stream.
    #[error("event stream closed")]
    Closed,

    /// The observer could not keep up and was disconnected; `skipped` events
    /// were dropped before the disconnect.
    #[error("observer overloaded; {skipped} events dropped")]
    Overloaded {
        /// Number of events this observer missed.
        skipped: u64,
    },
}

/// Subscription handle held by one connected observer.
///
/// Dropping the stream unsubscribes.
pub struct EventStream {
    rx: broadcast::Receiver<Event>,
    disconnected: bool,
}

impl EventStream {
    pub(crate) fn new(rx: broadcast::Receiver<Event>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// Receives the next task lifecycle event.
    ///
    /// Engine-internal events (subscriber overflow, shutdown lifecycle) are
    /// filtered out here; they never reach observers.
    pub async fn recv(&mut self) -> Result<Event, StreamError> {
        if self.disconnected {
            return Err(StreamError::Closed);
        }
        loop {
            match self.rx.recv().await {
                Ok(ev) if ev.status().is_some() => return Ok(ev),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    self.disconnected = true;
                    return Err(StreamError::Closed);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.disconnected = true;
                    return Err(StreamError::Overloaded { skipped });
                }
            }
        }
    }

    /// Encodes one event as a server-sent-events frame: `data: <JSON>\n\n`.
    ///
    /// Returns `None` for events with no wire form.
    pub fn sse_frame(event: &Event) -> Option<String> {
        let wire = event.wire()?;
        serde_json::to_string(&wire)
            .ok()
            .map(|json| format!("data: {json}\n\n"))
    }

    /// Forwards frames into `writer` until the stream ends.
    ///
    /// Consumes the stream. An overloaded or closed stream ends the loop
    /// cleanly (the client sees a closed connection, never malformed data);
    /// transport write errors are the client hanging up and are returned
    /// as-is.
    pub async fn forward<W>(mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            match self.recv().await {
                Ok(ev) => {
                    if let Some(frame) = Self::sse_frame(&ev) {
                        writer.write_all(frame.as_bytes()).await?;
                        writer.flush().await?;
                    }
                }
                Err(StreamError::Closed) => return Ok(()),
                Err(StreamError::Overloaded { skipped }) => {
                    tracing::warn!(skipped, "disconnecting overloaded observer");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Bus, EventKind};
    use serde_json::json;

    #[tokio::test]
    async fn test_recv_filters_runtime_events() {
        let bus = Bus::new(16);
        let mut stream = EventStream::new(bus.subscribe());

        bus.publish(Event::new(EventKind::ShutdownRequested));
        bus.publish(Event::task(EventKind::TaskStarted, "id-1", "demo").with_attempt(1));

        let ev = stream.recv().await.expect("lifecycle event delivered");
        assert_eq!(ev.kind, EventKind::TaskStarted);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = Bus::new(16);
        let mut stream = EventStream::new(bus.subscribe());
        drop(bus);

        assert_eq!(stream.recv().await, Err(StreamError::Closed));
        assert_eq!(stream.recv().await, Err(StreamError::Closed));
    }

    #[tokio::test]
    async fn test_lagging_observer_is_disconnected() {
        let bus = Bus::new(2);
        let mut stream = EventStream::new(bus.subscribe());
        for i in 0..5 {
            bus.publish(Event::task(EventKind::TaskStarted, "id-1", "demo").with_attempt(i));
        }

        let err = stream.recv().await.expect_err("observer fell behind");
        assert!(matches!(err, StreamError::Overloaded { skipped } if skipped > 0));
        assert_eq!(
            stream.recv().await,
            Err(StreamError::Closed),
            "overloaded stream behaves as closed afterwards"
        );
    }

    #[test]
    fn test_sse_frame_shape() {
        let ev = Event::task(EventKind::TaskSucceeded, "id-1", "add")
            .with_attempt(1)
            .with_result(json!(10));
        let frame = EventStream::sse_frame(&ev).expect("lifecycle event encodes");
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));

        let payload: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim_end())
                .expect("frame payload is JSON");
        assert_eq!(payload["status"], json!("SUCCESS"));
        assert_eq!(payload["result"], json!(10));
        assert_eq!(payload["task_name"], json!("add"));
    }

    #[test]
    fn test_runtime_event_has_no_frame() {
        assert!(EventStream::sse_frame(&Event::new(EventKind::GraceExceeded)).is_none());
    }

    #[tokio::test]
    async fn test_forward_writes_frames_until_close() {
        let bus = Bus::new(16);
        let stream = EventStream::new(bus.subscribe());
        bus.publish(Event::task(EventKind::TaskStarted, "id-1", "add").with_attempt(1));
        bus.publish(
            Event::task(EventKind::TaskSucceeded, "id-1", "add")
                .with_attempt(1)
                .with_result(json!(10)),
        );
        drop(bus);

        let mut sink: Vec<u8> = Vec::new();
        stream.forward(&mut sink).await.expect("forward completes");

        let text = String::from_utf8(sink).expect("frames are utf-8");
        let frames: Vec<&str> = text.split("\n\n").filter(|s| !s.is_empty()).collect();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].contains("\"STARTED\""));
        assert!(frames[1].contains("\"SUCCESS\""));
    }
}
