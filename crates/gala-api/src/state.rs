//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what they need
//! via Axum's `FromRef`, and to avoid a single god object with duplicate repositories.

use std::sync::Arc;

use gala_core::Config;
use gala_db::{EventRepository, FaceRepository, ImageRepository, TaskRepository};
use gala_processing::FaceEngineHandle;
use gala_storage::Storage;
use gala_worker::TaskQueue;
use sqlx::PgPool;

// ----- Sub-state types -----

/// Database pool, connection limits, and all repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub database: DatabaseConfig,
    pub event_repository: EventRepository,
    pub image_repository: ImageRepository,
    pub face_repository: FaceRepository,
    pub task_repository: TaskRepository,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

/// Upload limits, allowlists, and the storage backend.
#[derive(Clone)]
pub struct MediaConfig {
    pub storage: Arc<dyn Storage>,
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Face extraction engine and search defaults.
///
/// `embedding_dim` is the dimension of the vectors the engine produces. Every
/// stored face row and every probe embedding must have exactly this dimension;
/// search rejects mismatches before touching the index.
#[derive(Clone)]
pub struct FaceState {
    pub engine: FaceEngineHandle,
    pub embedding_dim: usize,
    pub default_max_distance: f64,
}

/// Task queue, its repository, and the dispatch context for the worker pool.
#[derive(Clone)]
pub struct TaskState {
    pub task_queue: TaskQueue,
    pub task_repository: TaskRepository,
    /// Strong handle to the worker's dispatch context. The worker pool only
    /// holds a `Weak` to it, so background processing stops as soon as the
    /// application state is dropped.
    pub context: Arc<TaskContext>,
}

/// Everything a background task handler needs to do its work.
///
/// Kept separate from [`AppState`] so the worker pool can hold a weak
/// reference without creating a cycle through the queue it runs in.
pub struct TaskContext {
    pub db: DbState,
    pub media: MediaConfig,
    pub faces: FaceState,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub media: MediaConfig,
    pub faces: FaceState,
    pub tasks: TaskState,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for FaceState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.faces.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for TaskState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.tasks.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
