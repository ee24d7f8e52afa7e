//! Face indexing for one upload batch.
//!
//! Downloads each photo of the batch, runs face extraction, and replaces the
//! image's face rows. Extraction itself never fails (undecodable photos come
//! back as zero faces), but a storage or database failure aborts the batch:
//! the event then stays unindexed rather than being reported searchable with
//! photos missing from the index.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use gala_core::models::{IndexBatchPayload, NewFace, Task};
use gala_core::{TaskError, TaskResultExt};
use gala_db::with_transaction;
use serde_json::json;

use crate::state::TaskContext;

#[tracing::instrument(
    skip(ctx, task),
    fields(
        task.id = %task.id,
        event_id = tracing::field::Empty,
        image_count = tracing::field::Empty
    )
)]
pub async fn run(ctx: Arc<TaskContext>, task: &Task) -> Result<serde_json::Value> {
    // A malformed payload can never succeed, no matter how often it is retried.
    let payload: IndexBatchPayload = task
        .try_payload_as()
        .context("Failed to parse index batch payload")
        .unrecoverable()?;

    tracing::Span::current().record("event_id", payload.event_id.to_string());
    tracing::Span::current().record("image_count", payload.jobs.len());

    tracing::info!(
        event_id = %payload.event_id,
        image_count = payload.jobs.len(),
        "Processing index batch task"
    );

    let started = Instant::now();

    if ctx
        .db
        .event_repository
        .get_event(payload.event_id)
        .await?
        .is_none()
    {
        return Err(TaskError::unrecoverable(anyhow::anyhow!(
            "Event {} no longer exists",
            payload.event_id
        ))
        .into());
    }

    let mut images_processed: u64 = 0;
    let mut images_skipped: u64 = 0;
    let mut faces_indexed: u64 = 0;

    for job in &payload.jobs {
        // A photo we cannot read is a photo we cannot index; abort so the
        // event is not reported searchable with this photo missing.
        let data = ctx
            .media
            .storage
            .download(&job.storage_key)
            .await
            .with_context(|| {
                format!(
                    "Failed to download {} for face extraction",
                    job.storage_key
                )
            })?;

        let detected = ctx.faces.engine.extract(&data).await;

        let image_id = job.image_id;
        let new_faces: Vec<NewFace> = detected
            .into_iter()
            .map(|face| NewFace {
                image_id,
                embedding: face.embedding,
                bbox: face.bbox,
            })
            .collect();

        if new_faces.is_empty() {
            tracing::info!(
                image_id = %image_id,
                storage_key = %job.storage_key,
                "No faces detected, skipping image"
            );
            images_skipped += 1;
        } else {
            images_processed += 1;
        }

        // Replace this image's face rows even when nothing was detected, so
        // re-indexing clears stale rows from an earlier pass.
        let face_repo = ctx.db.face_repository.clone();
        let inserted = with_transaction(&ctx.db.pool, move |tx| {
            Box::pin(async move {
                face_repo.delete_faces_for_image_tx(tx, image_id).await?;
                if new_faces.is_empty() {
                    Ok(0)
                } else {
                    face_repo.save_faces_tx(tx, &new_faces).await
                }
            })
        })
        .await?;

        faces_indexed += inserted;
    }

    // The flag flips only after every photo in the batch is in the index.
    let updated = ctx
        .db
        .event_repository
        .set_indexed(payload.event_id, true)
        .await?;
    if !updated {
        return Err(TaskError::unrecoverable(anyhow::anyhow!(
            "Event {} disappeared before it could be marked indexed",
            payload.event_id
        ))
        .into());
    }

    tracing::info!(
        event_id = %payload.event_id,
        images_processed,
        images_skipped,
        faces_indexed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Index batch completed, event is searchable"
    );

    Ok(json!({
        "status": "success",
        "event_id": payload.event_id,
        "images_processed": images_processed,
        "images_skipped": images_skipped,
        "faces_indexed": faces_indexed,
    }))
}
