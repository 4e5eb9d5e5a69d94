//! # Streaming gateway: long-lived per-observer event delivery.
//!
//! [`EventStream`] is the subscription handle an external observer holds for
//! the lifetime of its connection. It filters the bus down to task lifecycle
//! events, encodes them as server-sent-event frames, and enforces the
//! slow-consumer policy (disconnect on overload).

mod gateway;

pub use gateway::{EventStream, StreamError};
