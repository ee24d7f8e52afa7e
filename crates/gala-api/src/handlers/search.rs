//! Selfie search handler.
//!
//! The probe photo is processed entirely in memory: its bytes are never
//! written to storage and no face from it is persisted.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use gala_core::models::{closest_match_per_image, SearchParams, SearchResponse};
use gala_core::AppError;
use uuid::Uuid;

use crate::constants::SEARCH_CANDIDATE_LIMIT;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{extract_selfie, validate_content_type, validate_file_size};

#[utoipa::path(
    post,
    path = "/api/v0/events/{id}/search",
    tag = "search",
    summary = "Find every photo of an event a person appears in",
    description = "Takes a selfie as multipart field 'selfie', extracts the most prominent face, and returns the event's photos containing a face within max_distance of it, closest first. Requires the event to be fully indexed.",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        SearchParams
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Matching photos, closest first", body = SearchResponse),
        (status = 400, description = "Invalid selfie or parameters", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event is still being indexed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(
        event_id = %id,
        max_distance = tracing::field::Empty,
        match_count = tracing::field::Empty,
        operation = "search_event"
    )
)]
pub async fn search_event(
    Path(id): Path<Uuid>,
    Query(params): Query<SearchParams>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    // Validate search parameters early
    params.validate().map_err(AppError::InvalidInput)?;

    let event = state
        .db
        .event_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    // Searching a half-indexed event would silently miss photos, so refuse
    // until the pipeline has caught up.
    if !event.indexed {
        return Err(HttpAppError(AppError::IndexingInProgress {
            event_id: event.id,
        }));
    }

    let (selfie_data, content_type) = extract_selfie(multipart).await?;
    validate_file_size(selfie_data.len(), state.media.max_file_size)?;
    validate_content_type(&content_type, &state.media.allowed_content_types)?;

    let faces = state.faces.engine.extract(&selfie_data).await;

    // Faces come back ordered by detection confidence; the first one is the
    // most prominent face in the selfie.
    let probe = faces
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NoFaceDetected("No face found in the selfie".to_string()))?;

    if probe.embedding.len() != state.faces.embedding_dim {
        return Err(HttpAppError(AppError::EmbeddingDimensionMismatch {
            expected: state.faces.embedding_dim,
            actual: probe.embedding.len(),
        }));
    }

    let max_distance = params
        .max_distance
        .map(f64::from)
        .unwrap_or(state.faces.default_max_distance);
    tracing::Span::current().record("max_distance", max_distance);

    let neighbors = state
        .db
        .face_repository
        .find_similar(event.id, probe.embedding, max_distance, SEARCH_CANDIDATE_LIMIT)
        .await?;

    let matches = closest_match_per_image(neighbors);
    tracing::Span::current().record("match_count", matches.len());

    Ok(Json(SearchResponse {
        event_id: event.id,
        match_count: matches.len(),
        matches,
    }))
}
