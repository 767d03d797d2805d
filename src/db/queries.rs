use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::decode_text;
use crate::models::job::Job;
use crate::services::queue::{JobStore, QueueError};

const JOB_COLUMNS: &str = "id, job_type, payload, status, progress, result, error, attempts, \
                           max_attempts, created_at, started_at, completed_at";

fn job_from_row(row: &PgRow) -> Result<Job, sqlx::Error> {
    Ok(Job {
        id: row.try_get("id")?,
        job_type: row.try_get("job_type")?,
        payload: row.try_get("payload")?,
        status: decode_text(row, "status")?,
        progress: row.try_get("progress")?,
        result: row.try_get("result")?,
        error: row.try_get("error")?,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Job queue in the `jobs` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Number of jobs waiting to be claimed.
    pub async fn pending_count(&self) -> Result<i64, QueueError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM jobs WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid, QueueError> {
        let row = sqlx::query(
            r#"
            INSERT INTO jobs (job_type, payload, max_attempts)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(job_type)
        .bind(payload)
        .bind(max_attempts.max(1))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn claim_next(&self) -> Result<Option<Job>, QueueError> {
        // SKIP LOCKED lets concurrent claimants pass over a row another
        // transaction is already claiming instead of blocking on it.
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'running',
                attempts = attempts + 1,
                started_at = NOW(),
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending'
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

        Ok(row.as_ref().map(job_from_row).transpose()?)
    }

    async fn update_progress(&self, job_id: Uuid, progress: i32) -> Result<(), QueueError> {
        sqlx::query("UPDATE jobs SET progress = $1, updated_at = NOW() WHERE id = $2")
            .bind(progress.clamp(0, 100))
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError> {
        let done = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                progress = 100,
                result = $1,
                error = NULL,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(result)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(QueueError::NotFound(job_id));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), QueueError> {
        let done = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                result = to_jsonb($1::text),
                error = $1,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(QueueError::NotFound(job_id));
        }
        Ok(())
    }

    async fn retry(&self, job_id: Uuid, error: &str) -> Result<(), QueueError> {
        let done = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                progress = 0,
                error = $1,
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(QueueError::NotFound(job_id));
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, QueueError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(job_from_row).transpose()?)
    }
}
