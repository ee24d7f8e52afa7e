//! Batch photo upload handler.
//!
//! Accepts a multipart batch, stores the originals, then records the image
//! rows, resets the event's indexed flag, and enqueues one indexing task in a
//! single transaction. The upload response never waits for face extraction.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gala_core::models::{
    ImageResponse, IndexBatchPayload, IndexImageJob, Priority, Task, TaskType, UploadResponse,
};
use gala_core::AppError;
use gala_db::with_transaction;
use uuid::Uuid;

use crate::constants::MAX_UPLOAD_FILES_PER_BATCH;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{
    extract_image_batch, sanitize_filename, validate_content_type,
    validate_extension_content_type_match, validate_file_extension, validate_file_size,
};

#[derive(Clone)]
struct StoredUpload {
    file_name: String,
    storage_key: String,
    url: String,
}

#[utoipa::path(
    post,
    path = "/api/v0/events/{id}/images",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Batch accepted, indexing queued", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(event_id = %id, operation = "upload_images")
)]
pub async fn upload_images(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .db
        .event_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let files = extract_image_batch(multipart, MAX_UPLOAD_FILES_PER_BATCH).await?;

    // Validate the whole batch before writing a single byte.
    let mut safe_names = Vec::with_capacity(files.len());
    for file in &files {
        if file.data.is_empty() {
            return Err(HttpAppError(AppError::InvalidInput(format!(
                "File '{}' is empty",
                file.file_name
            ))));
        }
        validate_file_size(file.data.len(), state.media.max_file_size)?;
        validate_content_type(&file.content_type, &state.media.allowed_content_types)?;
        validate_file_extension(&file.file_name, &state.media.allowed_extensions)?;
        validate_extension_content_type_match(&file.file_name, &file.content_type)?;
        safe_names.push(sanitize_filename(&file.file_name)?);
    }

    // Store originals. On failure, remove what was already written and abort.
    let mut stored: Vec<StoredUpload> = Vec::with_capacity(files.len());
    for (file, safe_name) in files.into_iter().zip(safe_names) {
        let stored_name = format!("{}_{}", Uuid::new_v4(), safe_name);
        match state
            .media
            .storage
            .upload(event.id, &stored_name, &file.content_type, file.data)
            .await
        {
            Ok((storage_key, url)) => stored.push(StoredUpload {
                file_name: safe_name,
                storage_key,
                url,
            }),
            Err(e) => {
                cleanup_stored_files(&state, stored);
                return Err(HttpAppError::from(e));
            }
        }
    }

    let event_repo = state.db.event_repository.clone();
    let image_repo = state.db.image_repository.clone();
    let task_repo = state.tasks.task_repository.clone();
    let task_timeout = state.config.task_queue_default_timeout_seconds();
    let event_id = event.id;
    let stored_for_tx = stored.clone();

    // One transaction: the flag reset, the image rows, and the task commit
    // together or not at all. The worker can never see a task whose images
    // are missing, and no upload leaves the event marked indexed.
    let tx_result = with_transaction(&state.db.pool, move |tx| {
        Box::pin(async move {
            event_repo.set_indexed_tx(tx, event_id, false).await?;

            let mut images = Vec::with_capacity(stored_for_tx.len());
            for upload in &stored_for_tx {
                let image = image_repo
                    .create_image_tx(
                        tx,
                        event_id,
                        upload.file_name.clone(),
                        upload.storage_key.clone(),
                        upload.url.clone(),
                    )
                    .await?;
                images.push(image);
            }

            let jobs: Vec<IndexImageJob> = images
                .iter()
                .map(|image| IndexImageJob {
                    image_id: image.id,
                    storage_key: image.storage_key.clone(),
                })
                .collect();
            let payload = IndexBatchPayload { event_id, jobs };

            // Indexing batches never retry: a retry would re-run extraction on
            // images an earlier attempt already committed. Failed batches stay
            // failed and the event stays unindexed until the next upload.
            let task = task_repo
                .create_task_in(
                    tx,
                    TaskType::IndexBatch,
                    Task::payload_from(&payload),
                    Priority::Normal.as_i32(),
                    None,
                    Some(0),
                    Some(task_timeout),
                )
                .await
                .map_err(AppError::from)?;

            Ok((task, images))
        })
    })
    .await;

    let (task, images) = match tx_result {
        Ok(result) => result,
        Err(e) => {
            cleanup_stored_files(&state, stored);
            return Err(HttpAppError::from(e));
        }
    };

    tracing::info!(
        event_id = %event.id,
        task_id = %task.id,
        image_count = images.len(),
        "Upload batch accepted, indexing queued"
    );

    let response = UploadResponse {
        event_id: event.id,
        task_id: task.id,
        images: images.into_iter().map(ImageResponse::from).collect(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Remove already-stored files after a failed upload. Runs detached so the
/// error response is not delayed by storage round-trips.
fn cleanup_stored_files(state: &AppState, stored: Vec<StoredUpload>) {
    if stored.is_empty() {
        return;
    }
    let storage = state.media.storage.clone();
    tokio::spawn(async move {
        for upload in stored {
            if let Err(cleanup_err) = storage.delete(&upload.storage_key).await {
                tracing::warn!(
                    error = %cleanup_err,
                    storage_key = %upload.storage_key,
                    "Failed to cleanup storage file after upload error"
                );
            }
        }
    });
}
