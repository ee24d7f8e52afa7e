use gala_core::{models::Image, AppError};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for managing uploaded photos
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an image inside an existing transaction.
    ///
    /// Uploads record all images of a batch plus the indexing task in one
    /// transaction, so a batch is either fully visible or not at all.
    pub async fn create_image_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        file_name: String,
        storage_key: String,
        url: String,
    ) -> Result<Image, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            r#"
            INSERT INTO images (event_id, file_name, storage_key, url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, event_id, file_name, storage_key, url, created_at
            "#,
        )
        .bind(event_id)
        .bind(&file_name)
        .bind(&storage_key)
        .bind(&url)
        .fetch_one(&mut **tx)
        .await?;

        Ok(image)
    }

    /// Get image by ID
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    pub async fn get_image(&self, id: Uuid) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(
            "SELECT id, event_id, file_name, storage_key, url, created_at FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    /// List images of an event, oldest first (upload order)
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn list_for_event(
        &self,
        event_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<Postgres, Image>(
            r#"
            SELECT id, event_id, file_name, storage_key, url, created_at
            FROM images
            WHERE event_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(event_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// List every storage key for an event. Used when deleting an event to
    /// remove the underlying files.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn list_storage_keys_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<String>, AppError> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT storage_key FROM images WHERE event_id = $1")
                .bind(event_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(keys)
    }

    /// Count images of an event
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "count"))]
    pub async fn count_for_event(&self, event_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Delete image. Faces cascade in the database; callers are responsible
    /// for removing the stored file.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_image(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
