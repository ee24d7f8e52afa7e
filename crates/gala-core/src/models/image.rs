use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// A photo uploaded to an event gallery.
///
/// `storage_key` locates the original bytes in the storage backend;
/// `url` is the public address handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Image {
    pub id: Uuid,
    pub event_id: Uuid,
    pub file_name: String,
    pub storage_key: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        ImageResponse {
            id: image.id,
            event_id: image.event_id,
            file_name: image.file_name,
            url: image.url,
            created_at: image.created_at,
        }
    }
}

/// Response for a batch upload: the accepted images plus the id of the
/// indexing task that will process them in the background.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub event_id: Uuid,
    pub task_id: Uuid,
    pub images: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(default)]
pub struct ImageListQuery {
    /// Maximum number of results to return (default: 100, max: 500)
    pub limit: Option<i64>,
    /// Offset for pagination (default: 0)
    pub offset: Option<i64>,
}

impl Default for ImageListQuery {
    fn default() -> Self {
        Self {
            limit: Some(100),
            offset: Some(0),
        }
    }
}

impl ImageListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_response_from_image() {
        let now = Utc::now();
        let image = Image {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            file_name: "IMG_2041.jpg".to_string(),
            storage_key: "events/abc/IMG_2041.jpg".to_string(),
            url: "http://localhost:3000/files/events/abc/IMG_2041.jpg".to_string(),
            created_at: now,
        };

        let response = ImageResponse::from(image.clone());
        assert_eq!(response.id, image.id);
        assert_eq!(response.event_id, image.event_id);
        assert_eq!(response.file_name, "IMG_2041.jpg");
    }

    #[test]
    fn test_image_list_query_default() {
        let query = ImageListQuery::default();
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_image_list_query_clamps_limit() {
        let query = ImageListQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(query.limit(), 500);
        assert_eq!(query.offset(), 0);

        let zero = ImageListQuery {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(zero.limit(), 1);
    }
}
