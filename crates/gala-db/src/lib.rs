//! Gala Database Library
//!
//! Repository layer over PostgreSQL. Faces are stored as pgvector columns
//! behind the `face-search` feature (enabled by default).

pub mod db;

pub use db::transaction::with_transaction;
#[cfg(feature = "face-search")]
pub use db::FaceRepository;
pub use db::{EventRepository, ImageRepository, TaskRepository};
