use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// An event gallery: one wedding, conference day, party, etc.
///
/// `indexed` tracks whether every uploaded photo has been through face
/// extraction. Guests can only search an event once it flips to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub indexed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub indexed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        EventResponse {
            id: event.id,
            name: event.name,
            description: event.description,
            date: event.date,
            indexed: event.indexed,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Lightweight indexing status for polling clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventStatusResponse {
    pub id: Uuid,
    pub indexed: bool,
    pub image_count: i64,
    pub face_count: i64,
}

/// Request DTO for creating a new event
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateEventRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Event name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Request DTO for updating an event. Absent fields are left unchanged.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateEventRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Event name must be between 1 and 255 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl UpdateEventRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_response_from_event() {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            name: "Summer Wedding".to_string(),
            description: Some("Reception hall".to_string()),
            date: Some(now),
            indexed: true,
            created_at: now,
            updated_at: now,
        };

        let response = EventResponse::from(event.clone());
        assert_eq!(response.id, event.id);
        assert_eq!(response.name, "Summer Wedding");
        assert!(response.indexed);
    }

    #[test]
    fn test_create_event_request_validation() {
        let valid = CreateEventRequest {
            name: "Conference Day 1".to_string(),
            description: None,
            date: None,
        };
        assert!(valid.validate().is_ok());

        let empty_name = CreateEventRequest {
            name: String::new(),
            description: None,
            date: None,
        };
        assert!(empty_name.validate().is_err());

        let too_long = CreateEventRequest {
            name: "x".repeat(256),
            description: None,
            date: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_update_event_request_is_empty() {
        let empty = UpdateEventRequest {
            name: None,
            description: None,
            date: None,
        };
        assert!(empty.is_empty());

        let with_name = UpdateEventRequest {
            name: Some("Renamed".to_string()),
            description: None,
            date: None,
        };
        assert!(!with_name.is_empty());
    }
}
