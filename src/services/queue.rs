use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus};

/// A persisted job queue.
///
/// `claim_next` is the one operation that must be atomic: concurrent callers
/// never receive the same job. An empty queue is `Ok(None)`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a pending job and return its id.
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid, QueueError>;

    /// Move the oldest pending job to running and count the attempt.
    async fn claim_next(&self) -> Result<Option<Job>, QueueError>;

    async fn update_progress(&self, job_id: Uuid, progress: i32) -> Result<(), QueueError>;

    async fn complete(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError>;

    /// Mark the job failed. The error text is kept as both `error` and `result`.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), QueueError>;

    /// Put a running job back to pending for another attempt.
    async fn retry(&self, job_id: Uuid, error: &str) -> Result<(), QueueError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    NotFound(Uuid),
}

/// Queue held in process memory, for tests and single-process tools.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<VecDeque<Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All jobs in insertion order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().await.iter().cloned().collect()
    }
}

fn with_job<T>(
    jobs: &mut VecDeque<Job>,
    job_id: Uuid,
    f: impl FnOnce(&mut Job) -> T,
) -> Result<T, QueueError> {
    jobs.iter_mut()
        .find(|job| job.id == job_id)
        .map(f)
        .ok_or(QueueError::NotFound(job_id))
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        max_attempts: i32,
    ) -> Result<Uuid, QueueError> {
        let job = Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            payload,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        self.jobs.lock().await.push_back(job);
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<Job>, QueueError> {
        let mut jobs = self.jobs.lock().await;
        // Insertion order breaks created_at ties.
        let oldest = jobs
            .iter_mut()
            .enumerate()
            .filter(|(_, job)| job.status == JobStatus::Pending)
            .min_by_key(|(idx, job)| (job.created_at, *idx))
            .map(|(_, job)| job);

        Ok(oldest.map(|job| {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn update_progress(&self, job_id: Uuid, progress: i32) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        with_job(&mut jobs, job_id, |job| job.progress = progress.clamp(0, 100))
    }

    async fn complete(&self, job_id: Uuid, result: serde_json::Value) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        with_job(&mut jobs, job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.result = Some(result);
            job.error = None;
            job.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        with_job(&mut jobs, job_id, |job| {
            job.status = JobStatus::Failed;
            job.result = Some(serde_json::Value::String(error.to_string()));
            job.error = Some(error.to_string());
            job.completed_at = Some(Utc::now());
        })
    }

    async fn retry(&self, job_id: Uuid, error: &str) -> Result<(), QueueError> {
        let mut jobs = self.jobs.lock().await;
        with_job(&mut jobs, job_id, |job| {
            job.status = JobStatus::Pending;
            job.progress = 0;
            job.error = Some(error.to_string());
            job.started_at = None;
        })
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, QueueError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().find(|job| job.id == job_id).cloned())
    }
}
