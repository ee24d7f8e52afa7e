use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use gala_core::models::{Task, TaskStatus, TaskType};

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new task
    #[tracing::instrument(skip(self, payload))]
    pub async fn create_task(
        &self,
        task_type: TaskType,
        payload: serde_json::Value,
        priority: i32,
        scheduled_at: Option<DateTime<Utc>>,
        max_retries: Option<i32>,
        timeout_seconds: Option<i32>,
    ) -> Result<Task> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for task creation")?;

        let task = Self::insert_task(
            &mut tx,
            task_type,
            payload,
            priority,
            scheduled_at,
            max_retries,
            timeout_seconds,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!(
                error = %e,
                task_id = %task.id,
                "Failed to commit transaction for task creation"
            );
            anyhow::anyhow!("Failed to commit transaction: {}", e)
        })?;

        tracing::info!(
            task_id = %task.id,
            task_type = %task.task_type,
            priority = task.priority,
            "Task created"
        );

        Ok(task)
    }

    /// Create a new task inside an existing transaction.
    ///
    /// The upload flow uses this so the task row commits atomically with the
    /// image rows and the indexed-flag flip. Workers cannot observe the task
    /// before the images it references exist.
    pub async fn create_task_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        task_type: TaskType,
        payload: serde_json::Value,
        priority: i32,
        scheduled_at: Option<DateTime<Utc>>,
        max_retries: Option<i32>,
        timeout_seconds: Option<i32>,
    ) -> Result<Task> {
        Self::insert_task(
            tx,
            task_type,
            payload,
            priority,
            scheduled_at,
            max_retries,
            timeout_seconds,
        )
        .await
    }

    async fn insert_task(
        tx: &mut Transaction<'_, Postgres>,
        task_type: TaskType,
        payload: serde_json::Value,
        priority: i32,
        scheduled_at: Option<DateTime<Utc>>,
        max_retries: Option<i32>,
        timeout_seconds: Option<i32>,
    ) -> Result<Task> {
        let scheduled_at = scheduled_at.unwrap_or_else(Utc::now);
        let max_retries = max_retries.unwrap_or(3);
        let status = if scheduled_at > Utc::now() {
            TaskStatus::Scheduled
        } else {
            TaskStatus::Pending
        };

        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            INSERT INTO tasks (
                task_type, status, priority, payload, scheduled_at,
                max_retries, timeout_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            "#,
        )
        .bind(task_type.to_string())
        .bind(status)
        .bind(priority)
        .bind(payload)
        .bind(scheduled_at)
        .bind(max_retries)
        .bind(timeout_seconds)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                task_type = %task_type,
                "Failed to insert task into database"
            );
            anyhow::anyhow!("Failed to insert task into database: {}", e)
        })?;

        // Wake workers immediately instead of waiting for the poll interval.
        // Non-fatal: workers will discover the task via polling if this fails.
        if let Err(e) = sqlx::query("SELECT pg_notify('gala_new_task', '')")
            .execute(&mut **tx)
            .await
        {
            tracing::warn!(
                error = %e,
                task_id = %task.id,
                "Failed to send pg_notify for new task, workers will discover task via polling"
            );
        }

        Ok(task)
    }

    /// Get a task by ID
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch task")?;

        Ok(task)
    }

    /// Atomically claim the next available task.
    ///
    /// Uses FOR UPDATE SKIP LOCKED so concurrent workers never claim the
    /// same task.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next_task(&self) -> Result<Option<Task>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            FROM tasks
            WHERE status IN ('pending', 'scheduled')
                AND scheduled_at <= NOW()
            ORDER BY priority DESC, scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next task")?;

        if let Some(task) = task {
            let updated_task: Task = sqlx::query_as::<Postgres, Task>(
                r#"
                UPDATE tasks
                SET status = 'running',
                    started_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING
                    id, task_type, status, priority, payload, result,
                    scheduled_at, started_at, completed_at,
                    retry_count, max_retries, timeout_seconds,
                    created_at, updated_at
                "#,
            )
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to update task status")?;

            tx.commit().await.context("Failed to commit transaction")?;

            tracing::debug!(
                task_id = %updated_task.id,
                task_type = %updated_task.task_type,
                "Task claimed"
            );

            Ok(Some(updated_task))
        } else {
            tx.rollback().await.ok();
            Ok(None)
        }
    }

    /// Mark task as completed with result
    #[tracing::instrument(skip(self, result))]
    pub async fn mark_completed(&self, task_id: Uuid, result: serde_json::Value) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = 'completed',
                result = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(result)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task as completed")?;

        tracing::info!(
            task_id = %task_id,
            task_type = %task.task_type,
            "Task completed"
        );

        Ok(task)
    }

    /// Mark task as failed with error details
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, task_id: Uuid, error: serde_json::Value) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = 'failed',
                result = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task as failed")?;

        tracing::error!(
            task_id = %task_id,
            task_type = %task.task_type,
            retry_count = task.retry_count,
            "Task failed"
        );

        Ok(task)
    }

    /// Increment retry count and reschedule the task after a backoff delay
    #[tracing::instrument(skip(self))]
    pub async fn increment_retry(&self, task_id: Uuid, backoff_seconds: i64) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = 'scheduled',
                retry_count = retry_count + 1,
                scheduled_at = NOW() + make_interval(secs => $2),
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING
                id, task_type, status, priority, payload, result,
                scheduled_at, started_at, completed_at,
                retry_count, max_retries, timeout_seconds,
                created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(backoff_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to increment retry count")?;

        tracing::info!(
            task_id = %task_id,
            retry_count = task.retry_count,
            max_retries = task.max_retries,
            backoff_seconds = backoff_seconds,
            "Task retry scheduled"
        );

        Ok(task)
    }

    /// Recover tasks stuck in running state past their timeout plus a grace
    /// period, usually after a worker crash. Tasks with retry budget left go
    /// back to pending; the rest are failed. Returns the number of rows
    /// touched.
    #[tracing::instrument(skip(self))]
    pub async fn reap_stale_running_tasks(&self, grace_period_secs: i64) -> Result<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE tasks
            SET status = CASE WHEN retry_count < max_retries THEN 'pending' ELSE 'failed' END,
                retry_count = CASE WHEN retry_count < max_retries THEN retry_count + 1 ELSE retry_count END,
                result = CASE WHEN retry_count < max_retries THEN result
                              ELSE jsonb_build_object('error', 'Task timed out and was reaped') END,
                completed_at = CASE WHEN retry_count < max_retries THEN NULL ELSE NOW() END,
                started_at = NULL,
                updated_at = NOW()
            WHERE status = 'running'
                AND started_at IS NOT NULL
                AND started_at + make_interval(secs => COALESCE(timeout_seconds, 3600) + $1) < NOW()
            "#,
        )
        .bind(grace_period_secs as f64)
        .execute(&self.pool)
        .await
        .context("Failed to reap stale running tasks")?
        .rows_affected();

        if rows_affected > 0 {
            tracing::warn!(
                count = rows_affected,
                grace_period_secs = grace_period_secs,
                "Recovered stale running tasks"
            );
        }

        Ok(rows_affected)
    }

}
