//! Event CRUD and status endpoint integration tests.
//!
//! Run with: cargo test -p gala-api --test events_test
//! Requires Docker for testcontainers.

mod helpers;

use helpers::fixtures::photo_with_faces;
use helpers::{
    api_path, create_event, setup_test_app, setup_test_app_without_workers, upload_photos,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_create_and_get_event() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/events"))
        .json(&json!({
            "name": "Summer Gala 2025",
            "description": "Annual fundraiser",
            "date": "2025-07-01T18:00:00Z"
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Summer Gala 2025");
    assert_eq!(body["description"], "Annual fundraiser");
    // Events are created unindexed; only the pipeline flips the flag.
    assert_eq!(body["indexed"], false);
    let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let response = client.get(&api_path(&format!("/events/{}", id))).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Summer Gala 2025");
    assert_eq!(body["indexed"], false);
}

#[tokio::test]
async fn test_create_event_validates_name() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/events"))
        .json(&json!({ "name": "" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client.post(&api_path("/events")).json(&json!({})).await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .post(&api_path("/events"))
        .json(&json!({ "name": "x".repeat(256) }))
        .await;
    assert_eq!(response.status_code(), 400);

    // Wrong field types get the shared error shape, not a bare rejection.
    let response = client
        .post(&api_path("/events"))
        .json(&json!({ "name": 42 }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_list_events() {
    let app = setup_test_app().await;
    let client = app.client();

    create_event(client, "First Event").await;
    create_event(client, "Second Event").await;

    let response = client.get(&api_path("/events")).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    let names: Vec<&str> = events
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"First Event"));
    assert!(names.contains(&"Second Event"));
}

#[tokio::test]
async fn test_get_unknown_event_returns_404() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path(&format!("/events/{}", Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_event() {
    let app = setup_test_app().await;
    let client = app.client();
    let event_id = create_event(client, "Old Name").await;

    let response = client
        .patch(&api_path(&format!("/events/{}", event_id)))
        .json(&json!({ "name": "New Name" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "New Name");

    // An update with nothing to change is rejected.
    let response = client
        .patch(&api_path(&format!("/events/{}", event_id)))
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .patch(&api_path(&format!("/events/{}", Uuid::new_v4())))
        .json(&json!({ "name": "Whatever" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_delete_event_cascades_images() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Doomed Event").await;

    upload_photos(
        client,
        event_id,
        vec![
            ("a.jpg", photo_with_faces(&[1])),
            ("b.jpg", photo_with_faces(&[2])),
        ],
    )
    .await;

    let response = client
        .delete(&api_path(&format!("/events/{}", event_id)))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = client.get(&api_path(&format!("/events/{}", event_id))).await;
    assert_eq!(response.status_code(), 404);

    let image_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(image_count, 0);

    let response = client
        .delete(&api_path(&format!("/events/{}", event_id)))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_event_status_for_fresh_event() {
    let app = setup_test_app().await;
    let client = app.client();
    let event_id = create_event(client, "Quiet Event").await;

    let response = client
        .get(&api_path(&format!("/events/{}/status", event_id)))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], event_id.to_string());
    assert_eq!(body["indexed"], false);
    assert_eq!(body["image_count"], 0);
    assert_eq!(body["face_count"], 0);

    let response = client
        .get(&api_path(&format!("/events/{}/status", Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "healthy");

    let response = client.get("/live").await;
    assert_eq!(response.status_code(), 200);

    let response = client.get("/ready").await;
    assert_eq!(response.status_code(), 200);
}
