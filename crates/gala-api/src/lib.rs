//! Gala API Library
//!
//! This crate provides the HTTP API handlers, task handlers, and application setup.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod task_handlers;
mod telemetry;
mod utils;
mod validation;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use gala_worker::{TaskQueue, TaskQueueConfig};
