//! Service and repository wiring.

use std::sync::{Arc, Weak};

use anyhow::Result;
use gala_core::Config;
use gala_db::{EventRepository, FaceRepository, ImageRepository, TaskRepository};
use gala_processing::FaceEngineHandle;
use gala_storage::Storage;
use gala_worker::{TaskHandlerContext, TaskQueue, TaskQueueConfig};
use sqlx::PgPool;

use crate::state::{
    AppState, DatabaseConfig, DbState, FaceState, MediaConfig, TaskContext, TaskState,
};

/// Builds repositories, sub-states, and the task worker pool, and assembles
/// the final application state.
///
/// The worker pool receives only a `Weak` reference to its dispatch context;
/// the strong handle lives in [`TaskState`], so dropping the returned state
/// stops background dispatch instead of leaking a worker that outlives it.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
    face_engine: FaceEngineHandle,
) -> Result<Arc<AppState>> {
    let event_repository = EventRepository::new(pool.clone());
    let image_repository = ImageRepository::new(pool.clone());
    let face_repository = FaceRepository::new(pool.clone());
    let task_repository = TaskRepository::new(pool.clone());

    let is_production = config.is_production();
    tracing::info!(
        environment = %config.environment(),
        is_production = is_production,
        "Environment configuration loaded"
    );

    let db_state = DbState {
        pool: pool.clone(),
        database: DatabaseConfig {
            max_connections: config.db_max_connections(),
            timeout_seconds: config.db_timeout_seconds(),
        },
        event_repository,
        image_repository,
        face_repository,
        task_repository: task_repository.clone(),
    };

    let media_config = MediaConfig {
        storage,
        max_file_size: config.max_file_size_bytes(),
        allowed_extensions: config.allowed_extensions().to_vec(),
        allowed_content_types: config.allowed_content_types().to_vec(),
    };

    let face_state = FaceState {
        engine: face_engine,
        embedding_dim: config.face_embedding_dim(),
        default_max_distance: f64::from(config.default_search_max_distance()),
    };

    tracing::info!("Initializing task queue system...");
    let task_queue_config = TaskQueueConfig {
        max_workers: config.task_queue_max_workers(),
        poll_interval_ms: config.task_queue_poll_interval_ms(),
        default_timeout_seconds: config.task_queue_default_timeout_seconds(),
        max_retries: config.task_queue_max_retries(),
        stale_task_reap_interval_secs: config.task_queue_stale_task_reap_interval_secs(),
        stale_task_grace_period_secs: config.task_queue_stale_task_grace_period_secs(),
    };

    let task_context = Arc::new(TaskContext {
        db: db_state.clone(),
        media: media_config.clone(),
        faces: face_state.clone(),
    });
    let context_weak: Weak<dyn TaskHandlerContext> = Arc::<TaskContext>::downgrade(&task_context);

    let task_queue = TaskQueue::new(
        task_repository.clone(),
        task_queue_config,
        context_weak,
        Some(pool),
    );
    tracing::info!(
        max_workers = config.task_queue_max_workers(),
        "Task queue system initialized successfully"
    );

    let state = Arc::new(AppState {
        db: db_state,
        media: media_config,
        faces: face_state,
        tasks: TaskState {
            task_queue,
            task_repository,
            context: task_context,
        },
        config: config.clone(),
        is_production,
    });

    Ok(state)
}
