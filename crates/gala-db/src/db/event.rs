use chrono::{DateTime, Utc};
use gala_core::{models::Event, AppError};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Repository for managing event galleries
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event. Events start unindexed; the flag flips to true
    /// when an upload batch finishes face extraction.
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "insert"))]
    pub async fn create_event(
        &self,
        name: String,
        description: Option<String>,
        date: Option<DateTime<Utc>>,
    ) -> Result<Event, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            r#"
            INSERT INTO events (name, description, date)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, date, indexed, created_at, updated_at
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Get event by ID
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "select", db.record_id = %id))]
    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            "SELECT id, name, description, date, indexed, created_at, updated_at FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List all events, newest first
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "select"))]
    pub async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<Postgres, Event>(
            "SELECT id, name, description, date, indexed, created_at, updated_at FROM events ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Update event fields. Absent fields are left unchanged.
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "update", db.record_id = %id))]
    pub async fn update_event(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        date: Option<DateTime<Utc>>,
    ) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            r#"
            UPDATE events
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                date = COALESCE($4, date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, date, indexed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Delete event. Images and faces cascade in the database; callers are
    /// responsible for removing stored files.
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_event(&self, id: Uuid) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Set the indexed flag
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "update", db.record_id = %id))]
    pub async fn set_indexed(&self, id: Uuid, indexed: bool) -> Result<bool, AppError> {
        let rows_affected =
            sqlx::query("UPDATE events SET indexed = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(indexed)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Set the indexed flag inside an existing transaction.
    ///
    /// Used by the upload flow: the flag must flip to false in the same
    /// transaction that records the new images, so no searcher can observe
    /// unindexed photos behind a true flag.
    pub async fn set_indexed_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        indexed: bool,
    ) -> Result<bool, AppError> {
        let rows_affected =
            sqlx::query("UPDATE events SET indexed = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(indexed)
                .execute(&mut **tx)
                .await?
                .rows_affected();

        Ok(rows_affected > 0)
    }
}
