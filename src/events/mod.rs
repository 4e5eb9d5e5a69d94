//! # Status events and their broadcast channel.
//!
//! - [`TaskStatus`] — the lifecycle status vocabulary shared by the result
//!   store, status queries, and the wire encoding.
//! - [`Event`] / [`EventKind`] — one state change, as published on the bus.
//! - [`Bus`] — broadcast fan-out carrying every event to all current
//!   subscribers, with no replay for late joiners.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, TaskStatus, WireEvent};
