//! # Engine core: configuration, builder, worker pool, and the facade.

mod builder;
mod config;
mod engine;
mod runner;
mod shutdown;
mod worker;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use engine::{RevokeOutcome, StatusSnapshot, TaskEngine};
pub use shutdown::wait_for_shutdown_signal;
