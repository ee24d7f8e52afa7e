//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain. Each sub-module represents a specific feature area.

mod event;
mod face;
mod image;
mod task;

// Re-export all models for convenient imports
pub use event::*;
pub use face::*;
pub use image::*;
pub use task::*;
