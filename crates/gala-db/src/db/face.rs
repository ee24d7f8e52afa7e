use gala_core::{
    models::{FaceNeighbor, NewFace},
    AppError,
};
use pgvector::Vector;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for stored face embeddings
#[derive(Clone)]
pub struct FaceRepository {
    pool: PgPool,
}

impl FaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert all faces of one image inside an existing transaction.
    ///
    /// The indexing job pairs this with [`delete_faces_for_image_tx`] in one
    /// transaction per image, so re-indexing replaces rather than accumulates.
    pub async fn save_faces_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        faces: &[NewFace],
    ) -> Result<u64, AppError> {
        let mut inserted = 0u64;
        for face in faces {
            sqlx::query(
                r#"
                INSERT INTO faces (image_id, embedding, x, y, w, h)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(face.image_id)
            .bind(Vector::from(face.embedding.clone()))
            .bind(face.bbox.x)
            .bind(face.bbox.y)
            .bind(face.bbox.w)
            .bind(face.bbox.h)
            .execute(&mut **tx)
            .await?;
            inserted += 1;
        }

        Ok(inserted)
    }

    /// Delete all faces of an image inside an existing transaction.
    pub async fn delete_faces_for_image_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        image_id: Uuid,
    ) -> Result<u64, AppError> {
        let rows_affected = sqlx::query("DELETE FROM faces WHERE image_id = $1")
            .bind(image_id)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Find stored faces within `max_distance` of the query embedding,
    /// scoped to one event, ordered by cosine distance ascending.
    ///
    /// Faces of other events never appear in the result regardless of how
    /// close their embeddings are.
    #[tracing::instrument(
        skip(self, embedding),
        fields(db.table = "faces", db.operation = "vector_search", event_id = %event_id)
    )]
    pub async fn find_similar(
        &self,
        event_id: Uuid,
        embedding: Vec<f32>,
        max_distance: f64,
        limit: i64,
    ) -> Result<Vec<FaceNeighbor>, AppError> {
        let vector = Vector::from(embedding);

        let neighbors = sqlx::query_as::<Postgres, FaceNeighbor>(
            r#"
            SELECT
                i.id AS image_id,
                i.file_name,
                i.url,
                (f.embedding <=> $2)::float8 AS distance,
                f.x,
                f.y,
                f.w,
                f.h
            FROM faces f
            JOIN images i ON f.image_id = i.id
            WHERE i.event_id = $1
                AND (f.embedding <=> $2) < $3
            ORDER BY f.embedding <=> $2
            LIMIT $4
            "#,
        )
        .bind(event_id)
        .bind(vector)
        .bind(max_distance)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(neighbors)
    }

    /// Count stored faces of an event
    #[tracing::instrument(skip(self), fields(db.table = "faces", db.operation = "count"))]
    pub async fn count_faces_for_event(&self, event_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM faces f
            JOIN images i ON f.image_id = i.id
            WHERE i.event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
