//! Gala Core Library
//!
//! This crate provides core domain models, error types, and configuration
//! that are shared across all Gala components.

pub mod config;
pub mod error;
pub mod models;
pub mod task_error;

// Re-export commonly used types
pub use config::{BaseConfig, Config, GalleryConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use task_error::{TaskError, TaskResultExt};
