//! Gala Worker Library
//!
//! Postgres-backed task queue used for background face indexing. The API
//! submits tasks and implements [`TaskHandlerContext`]; the worker pool claims
//! tasks and dispatches them back through that context.

pub mod context;
pub mod queue;

pub use context::TaskHandlerContext;
pub use queue::{TaskQueue, TaskQueueConfig, MAX_RETRY_BACKOFF_SECS, TASK_NOTIFY_CHANNEL};
