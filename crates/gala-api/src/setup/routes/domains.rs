//! Domain route groups (events, images, search).

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;

pub fn event_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/events", API_PREFIX),
            post(handlers::events::create_event),
        )
        .route(
            &format!("{}/events", API_PREFIX),
            get(handlers::events::list_events),
        )
        .route(
            &format!("{}/events/{{id}}", API_PREFIX),
            get(handlers::events::get_event),
        )
        .route(
            &format!("{}/events/{{id}}", API_PREFIX),
            patch(handlers::events::update_event),
        )
        .route(
            &format!("{}/events/{{id}}", API_PREFIX),
            delete(handlers::events::delete_event),
        )
        .route(
            &format!("{}/events/{{id}}/status", API_PREFIX),
            get(handlers::events::get_event_status),
        )
        .with_state(state)
}

pub fn image_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/events/{{id}}/images", API_PREFIX),
            post(handlers::uploads::upload_images),
        )
        .route(
            &format!("{}/events/{{id}}/images", API_PREFIX),
            get(handlers::images::list_images),
        )
        .route(
            &format!("{}/images/{{id}}", API_PREFIX),
            delete(handlers::images::delete_image),
        )
        .with_state(state)
}

pub fn search_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/events/{{id}}/search", API_PREFIX),
            post(handlers::search::search_event),
        )
        .with_state(state)
}
