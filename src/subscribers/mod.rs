//! # In-process event subscribers.
//!
//! External observers attach through the streaming gateway
//! ([`EventStream`](crate::EventStream)); in-process observers (logging,
//! metrics, alerting) implement [`Subscribe`] and are driven by a
//! [`SubscriberSet`], which gives each subscriber a dedicated worker and a
//! bounded queue so a slow subscriber never blocks publishing or its peers.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
