//! Background face-indexing pipeline tests.
//!
//! Run with: cargo test -p gala-api --test indexing_test
//! Requires Docker for testcontainers.
//!
//! Tests that exercise failure paths disable the worker pool and drive task
//! dispatch by hand, so a half-processed batch can be observed deterministically.

mod helpers;

use helpers::fixtures::{photo_with_faces, photo_without_faces};
use helpers::{
    api_path, count_faces, create_event, setup_test_app, setup_test_app_without_workers,
    upload_photos, wait_until_indexed,
};
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn test_batch_indexing_end_to_end() {
    let app = setup_test_app().await;
    let client = app.client();
    let event_id = create_event(client, "Wedding").await;

    // Three photos: two faces, none, one face.
    upload_photos(
        client,
        event_id,
        vec![
            ("group.jpg", photo_with_faces(&[1, 2])),
            ("venue.jpg", photo_without_faces()),
            ("portrait.jpg", photo_with_faces(&[3])),
        ],
    )
    .await;

    wait_until_indexed(client, event_id).await;

    let response = client
        .get(&api_path(&format!("/events/{}/status", event_id)))
        .await;
    assert_eq!(response.status_code(), 200);
    let status: serde_json::Value = response.json();
    assert_eq!(status["indexed"], true);
    assert_eq!(status["image_count"], 3);
    assert_eq!(status["face_count"], 3);

    assert_eq!(count_faces(&app.pool, event_id).await, 3);

    // The worker marks the task completed after the handler returns; give it
    // a moment to catch up.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task_status: String =
            sqlx::query_scalar("SELECT status::text FROM tasks ORDER BY created_at DESC LIMIT 1")
                .fetch_one(&app.pool)
                .await
                .unwrap();
        if task_status == "completed" {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("Task never reached completed status, last seen: {}", task_status);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_zero_face_batch_still_indexes() {
    let app = setup_test_app().await;
    let client = app.client();
    let event_id = create_event(client, "Landscapes Only").await;

    upload_photos(client, event_id, vec![("hill.jpg", photo_without_faces())]).await;

    wait_until_indexed(client, event_id).await;

    let response = client
        .get(&api_path(&format!("/events/{}/status", event_id)))
        .await;
    let status: serde_json::Value = response.json();
    assert_eq!(status["indexed"], true);
    assert_eq!(status["image_count"], 1);
    assert_eq!(status["face_count"], 0);
}

#[tokio::test]
async fn test_dispatch_reports_batch_summary() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Summary Event").await;

    upload_photos(
        client,
        event_id,
        vec![
            ("faces.jpg", photo_with_faces(&[1, 2])),
            ("empty.jpg", photo_without_faces()),
        ],
    )
    .await;

    let task = app.claim_next_task().await;
    let result = app.dispatch_task(&task).await.unwrap();

    assert_eq!(result["status"], "success");
    assert_eq!(result["event_id"], event_id.to_string());
    assert_eq!(result["images_processed"], 1);
    assert_eq!(result["images_skipped"], 1);
    assert_eq!(result["faces_indexed"], 2);

    let response = client.get(&api_path(&format!("/events/{}", event_id))).await;
    let event: serde_json::Value = response.json();
    assert_eq!(event["indexed"], true);
}

#[tokio::test]
async fn test_reindexing_replaces_face_rows() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Idempotent Event").await;

    upload_photos(client, event_id, vec![("a.jpg", photo_with_faces(&[5]))]).await;
    let task = app.claim_next_task().await;

    app.dispatch_task(&task).await.unwrap();
    assert_eq!(count_faces(&app.pool, event_id).await, 1);

    // Running the same batch again replaces rows instead of duplicating them.
    app.dispatch_task(&task).await.unwrap();
    assert_eq!(count_faces(&app.pool, event_id).await, 1);
}

#[tokio::test]
async fn test_storage_failure_aborts_batch() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Broken Storage Event").await;

    upload_photos(
        client,
        event_id,
        vec![
            ("a.jpg", photo_with_faces(&[1])),
            ("b.jpg", photo_with_faces(&[2])),
        ],
    )
    .await;

    // Remove the first photo's file so the batch fails on its first download.
    let storage_key: String = sqlx::query_scalar(
        "SELECT storage_key FROM images WHERE event_id = $1 AND file_name = 'a.jpg'",
    )
    .bind(event_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    std::fs::remove_file(app.storage_root.join(&storage_key)).unwrap();

    let task = app.claim_next_task().await;
    let err = app.dispatch_task(&task).await.unwrap_err();
    assert!(
        format!("{:#}", err).contains("Failed to download"),
        "unexpected error: {:#}",
        err
    );

    // The batch aborted, so nothing was indexed and the event stays unsearchable.
    let response = client.get(&api_path(&format!("/events/{}", event_id))).await;
    let event: serde_json::Value = response.json();
    assert_eq!(event["indexed"], false);
    assert_eq!(count_faces(&app.pool, event_id).await, 0);
}

#[tokio::test]
async fn test_batch_for_deleted_event_fails() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Vanishing Event").await;

    upload_photos(client, event_id, vec![("a.jpg", photo_with_faces(&[1]))]).await;

    let response = client
        .delete(&api_path(&format!("/events/{}", event_id)))
        .await;
    assert_eq!(response.status_code(), 204);

    let task = app.claim_next_task().await;
    let err = app.dispatch_task(&task).await.unwrap_err();
    assert!(
        format!("{:#}", err).contains("no longer exists"),
        "unexpected error: {:#}",
        err
    );
}

#[tokio::test]
async fn test_each_batch_gets_its_own_task() {
    let app = setup_test_app_without_workers().await;
    let client = app.client();
    let event_id = create_event(client, "Two Batches").await;

    let first = upload_photos(client, event_id, vec![("a.jpg", photo_with_faces(&[1]))]).await;
    let second = upload_photos(client, event_id, vec![("b.jpg", photo_with_faces(&[2]))]).await;

    let first_task = Uuid::parse_str(first["task_id"].as_str().unwrap()).unwrap();
    let second_task = Uuid::parse_str(second["task_id"].as_str().unwrap()).unwrap();
    assert_ne!(first_task, second_task);

    let task_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(task_count, 2);

    // Each batch marks the event searchable when it completes; the upload
    // itself is what resets the flag for a new batch.
    let task = app.claim_next_task().await;
    app.dispatch_task(&task).await.unwrap();
    let task = app.claim_next_task().await;
    app.dispatch_task(&task).await.unwrap();

    let response = client
        .get(&api_path(&format!("/events/{}/status", event_id)))
        .await;
    let status: serde_json::Value = response.json();
    assert_eq!(status["indexed"], true);
    assert_eq!(status["face_count"], 2);
}
