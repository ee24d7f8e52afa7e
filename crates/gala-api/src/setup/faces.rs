//! Face engine setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gala_core::Config;
use gala_processing::{FaceEngineConfig, FaceEngineHandle, FaceExtractor, OnnxFaceEngine};

/// Load the ONNX face engine and wrap it in a concurrency-limited handle.
///
/// Fails when the embedding dimension the engine produces does not match the
/// configured one: rows of a different dimension would poison the vector index.
pub async fn setup_face_engine(config: &Config) -> Result<FaceEngineHandle> {
    tracing::info!(
        models_dir = %config.face_models_dir(),
        auto_download = config.face_auto_download_models(),
        "Loading face engine..."
    );

    let engine = OnnxFaceEngine::load(FaceEngineConfig {
        models_dir: PathBuf::from(config.face_models_dir()),
        auto_download: config.face_auto_download_models(),
        detection_confidence: config.face_detection_confidence(),
        nms_iou: config.face_nms_iou(),
    })
    .await
    .context("Failed to load face engine models")?;

    let engine_dim = engine.embedding_dim();
    if engine_dim != config.face_embedding_dim() {
        return Err(anyhow::anyhow!(
            "Face engine produces {}-dimensional embeddings but FACE_EMBEDDING_DIM is {}",
            engine_dim,
            config.face_embedding_dim()
        ));
    }

    let extractor: Arc<dyn FaceExtractor> = Arc::new(engine);
    let handle = FaceEngineHandle::new(
        extractor,
        config.face_max_concurrent_extractions(),
        Duration::from_secs(config.face_extraction_timeout_seconds()),
    );

    tracing::info!(
        embedding_dim = engine_dim,
        max_concurrent = config.face_max_concurrent_extractions(),
        timeout_seconds = config.face_extraction_timeout_seconds(),
        "Face engine loaded successfully"
    );

    Ok(handle)
}
