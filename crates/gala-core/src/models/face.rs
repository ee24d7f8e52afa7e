use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Pixel-space face location within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// One detected face: the stored embedding plus where it sits in the photo.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Face {
    pub id: Uuid,
    pub image_id: Uuid,
    #[cfg(feature = "face-search")]
    pub embedding: pgvector::Vector,
    #[cfg(not(feature = "face-search"))]
    pub embedding: Vec<f32>,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub created_at: DateTime<Utc>,
}

impl Face {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

/// A face to persist, produced by the extraction pipeline.
#[derive(Debug, Clone)]
pub struct NewFace {
    pub image_id: Uuid,
    pub embedding: Vec<f32>,
    pub bbox: BoundingBox,
}

/// One row from the similarity query: a stored face within the distance
/// threshold, joined with its parent image. Ordered by `distance` ascending.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FaceNeighbor {
    pub image_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub distance: f64,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl FaceNeighbor {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

/// One matching photo in a search result. `face` is the closest matching
/// face in that photo; `distance` is its cosine distance to the query.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchMatch {
    pub image_id: Uuid,
    pub file_name: String,
    pub url: String,
    pub distance: f64,
    pub face: BoundingBox,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub event_id: Uuid,
    pub match_count: usize,
    pub matches: Vec<SearchMatch>,
}

#[derive(Debug, Default, Deserialize, ToSchema, utoipa::IntoParams)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum cosine distance for a face to count as a match
    /// (default: server-configured, normally 0.6). Must be in (0, 2].
    #[param(minimum = 0.0, maximum = 2.0, example = 0.6)]
    pub max_distance: Option<f32>,
}

impl SearchParams {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(d) = self.max_distance {
            if !(d > 0.0 && d <= 2.0) {
                return Err("max_distance must be greater than 0 and at most 2".to_string());
            }
        }
        Ok(())
    }
}

/// Collapse the neighbor rows into one match per photo.
///
/// Input must be ordered by distance ascending (the similarity query
/// guarantees this). The first row seen for an image is therefore its
/// closest face, and first-seen order is ascending best-distance order.
pub fn closest_match_per_image(neighbors: Vec<FaceNeighbor>) -> Vec<SearchMatch> {
    let mut seen = std::collections::HashSet::new();
    let mut matches = Vec::new();
    for neighbor in neighbors {
        if seen.insert(neighbor.image_id) {
            let face = neighbor.bounding_box();
            matches.push(SearchMatch {
                image_id: neighbor.image_id,
                file_name: neighbor.file_name,
                url: neighbor.url,
                distance: neighbor.distance,
                face,
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(image_id: Uuid, distance: f64, x: i32) -> FaceNeighbor {
        FaceNeighbor {
            image_id,
            file_name: "photo.jpg".to_string(),
            url: "http://localhost/photo.jpg".to_string(),
            distance,
            x,
            y: 20,
            w: 80,
            h: 90,
        }
    }

    #[test]
    fn test_closest_match_keeps_first_face_per_image() {
        let image_a = Uuid::new_v4();
        let image_b = Uuid::new_v4();
        let neighbors = vec![
            neighbor(image_a, 0.12, 10),
            neighbor(image_b, 0.25, 30),
            neighbor(image_a, 0.41, 200),
        ];

        let matches = closest_match_per_image(neighbors);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].image_id, image_a);
        assert_eq!(matches[0].distance, 0.12);
        assert_eq!(matches[0].face.x, 10);
        assert_eq!(matches[1].image_id, image_b);
    }

    #[test]
    fn test_closest_match_preserves_ascending_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let neighbors = vec![
            neighbor(ids[2], 0.05, 1),
            neighbor(ids[0], 0.10, 2),
            neighbor(ids[3], 0.30, 3),
            neighbor(ids[1], 0.55, 4),
        ];

        let matches = closest_match_per_image(neighbors);
        let order: Vec<Uuid> = matches.iter().map(|m| m.image_id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[3], ids[1]]);
        assert!(matches.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_closest_match_empty_input() {
        let matches = closest_match_per_image(Vec::new());
        assert!(matches.is_empty());
    }

    #[test]
    fn test_face_bounding_box() {
        let n = neighbor(Uuid::new_v4(), 0.2, 15);
        let bbox = n.bounding_box();
        assert_eq!(bbox, BoundingBox { x: 15, y: 20, w: 80, h: 90 });
    }

    #[test]
    fn test_search_params_validate() {
        assert!(SearchParams { max_distance: None }.validate().is_ok());
        assert!(SearchParams {
            max_distance: Some(0.6)
        }
        .validate()
        .is_ok());
        assert!(SearchParams {
            max_distance: Some(2.0)
        }
        .validate()
        .is_ok());
        assert!(SearchParams {
            max_distance: Some(0.0)
        }
        .validate()
        .is_err());
        assert!(SearchParams {
            max_distance: Some(2.5)
        }
        .validate()
        .is_err());
    }
}
