//! Database repositories for data access layer
//!
//! Each repository owns the SQL for one domain entity and provides CRUD
//! operations and specialized queries.

pub mod event;
#[cfg(feature = "face-search")]
pub mod face;
pub mod image;
pub mod task;
//
// Transaction utilities
pub mod transaction;

pub use event::EventRepository;
#[cfg(feature = "face-search")]
pub use face::FaceRepository;
pub use image::ImageRepository;
pub use task::TaskRepository;
