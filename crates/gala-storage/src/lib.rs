//! Gala Storage Library
//!
//! This crate provides the storage abstraction for event photo galleries.
//! It includes the Storage trait and a local filesystem implementation.
//!
//! # Storage key format
//!
//! Storage keys are event-scoped. All backends use the same key layout:
//!
//! - `events/{event_id}/{filename}`
//!
//! Keys must not contain `..` or a leading `/`.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
