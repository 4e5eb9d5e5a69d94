//! # Task definitions: handlers, invocations, and the registry.
//!
//! - [`Handler`] — the async, cancellable unit of business logic; implement it
//!   directly or wrap a closure with [`HandlerFn`].
//! - [`TaskInvocation`] — one request to execute a task type with specific
//!   arguments; immutable once created.
//! - [`TaskRegistry`] — maps a task-type name to its handler and retry policy;
//!   populated before the engine starts, read-only thereafter.

mod handler;
mod handler_fn;
mod invocation;
mod registry;

pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
pub use invocation::TaskInvocation;
pub use registry::TaskRegistry;
