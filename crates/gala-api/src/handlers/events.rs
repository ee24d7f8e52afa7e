//! Event CRUD and indexing status handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gala_core::models::{
    CreateEventRequest, EventResponse, EventStatusResponse, UpdateEventRequest,
};
use gala_core::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v0/events",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, payload),
    fields(event_name = %payload.name, operation = "create_event")
)]
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<CreateEventRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate().map_err(AppError::from)?;

    let event = state
        .db
        .event_repository
        .create_event(payload.name, payload.description, payload.date)
        .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

#[utoipa::path(
    get,
    path = "/api/v0/events",
    tag = "events",
    responses(
        (status = 200, description = "List of events", body = Vec<EventResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_events"))]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let events = state.db.event_repository.list_events().await?;

    let responses: Vec<EventResponse> = events.into_iter().map(EventResponse::from).collect();

    Ok(Json(responses))
}

#[utoipa::path(
    get,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event found", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(event_id = %id, operation = "get_event"))]
pub async fn get_event(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .db
        .event_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(EventResponse::from(event)))
}

#[utoipa::path(
    patch,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(event_id = %id, operation = "update_event"))]
pub async fn update_event(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    payload.validate().map_err(AppError::from)?;
    if payload.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "At least one of name, description, or date must be provided".to_string(),
        )));
    }

    let event = state
        .db
        .event_repository
        .update_event(id, payload.name, payload.description, payload.date)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(EventResponse::from(event)))
}

#[utoipa::path(
    delete,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(event_id = %id, operation = "delete_event"))]
pub async fn delete_event(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Collect keys before the rows cascade away.
    let storage_keys = state
        .db
        .image_repository
        .list_storage_keys_for_event(id)
        .await?;

    let deleted = state.db.event_repository.delete_event(id).await?;
    if !deleted {
        return Err(HttpAppError(AppError::NotFound(
            "Event not found".to_string(),
        )));
    }

    // Rows are gone; file removal is best-effort.
    let storage = state.media.storage.clone();
    tokio::spawn(async move {
        for key in storage_keys {
            if let Err(e) = storage.delete(&key).await {
                tracing::warn!(
                    error = %e,
                    storage_key = %key,
                    "Failed to delete storage file after event delete"
                );
            }
        }
    });

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v0/events/{id}/status",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Indexing status", body = EventStatusResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(event_id = %id, operation = "get_event_status"))]
pub async fn get_event_status(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let event = state
        .db
        .event_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let image_count = state.db.image_repository.count_for_event(id).await?;
    let face_count = state.db.face_repository.count_faces_for_event(id).await?;

    Ok(Json(EventStatusResponse {
        id: event.id,
        indexed: event.indexed,
        image_count,
        face_count,
    }))
}
