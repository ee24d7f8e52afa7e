//! Image listing and deletion handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gala_core::models::{ImageListQuery, ImageResponse};
use gala_core::AppError;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v0/events/{id}/images",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        ImageListQuery
    ),
    responses(
        (status = 200, description = "Images of the event in upload order", body = Vec<ImageResponse>),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, query),
    fields(event_id = %id, operation = "list_images")
)]
pub async fn list_images(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImageListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .db
        .event_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let images = state
        .db
        .image_repository
        .list_for_event(event.id, query.limit(), query.offset())
        .await?;

    let responses: Vec<ImageResponse> = images.into_iter().map(ImageResponse::from).collect();

    Ok(Json(responses))
}

#[utoipa::path(
    delete,
    path = "/api/v0/images/{id}",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id, operation = "delete_image"))]
pub async fn delete_image(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let image = state
        .db
        .image_repository
        .get_image(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    let deleted = state.db.image_repository.delete_image(id).await?;
    if !deleted {
        return Err(HttpAppError(AppError::NotFound(
            "Image not found".to_string(),
        )));
    }

    // Face rows cascade with the image row; the file is best-effort.
    let storage = state.media.storage.clone();
    let storage_key = image.storage_key;
    tokio::spawn(async move {
        if let Err(e) = storage.delete(&storage_key).await {
            tracing::warn!(
                error = %e,
                storage_key = %storage_key,
                "Failed to delete storage file after image delete"
            );
        }
    });

    Ok(StatusCode::NO_CONTENT)
}
