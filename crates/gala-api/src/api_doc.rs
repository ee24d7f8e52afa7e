//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use gala_core::models;

/// Returns the OpenAPI spec served at /api/openapi.json.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gala API",
        version = "0.1.0",
        description = "Photo event gallery API (v0). Guests upload event photos, a background pipeline indexes the faces in them, and a selfie search returns every photo a person appears in. All endpoints are versioned under /api/v0/.",
    ),
    paths(
        // Events
        handlers::events::create_event,
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::events::get_event_status,
        // Images
        handlers::uploads::upload_images,
        handlers::images::list_images,
        handlers::images::delete_image,
        // Search
        handlers::search::search_event,
    ),
    components(
        schemas(
            // Event models
            models::EventResponse,
            models::EventStatusResponse,
            models::CreateEventRequest,
            models::UpdateEventRequest,
            // Image models
            models::ImageResponse,
            models::UploadResponse,
            // Search models
            models::BoundingBox,
            models::SearchMatch,
            models::SearchResponse,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "events", description = "Event creation, management, and indexing status"),
        (name = "images", description = "Photo upload and management within an event"),
        (name = "search", description = "Selfie search across an event's indexed faces")
    )
)]
pub struct ApiDoc;
