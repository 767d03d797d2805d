//! Single-slot job worker.
//!
//! The worker claims one job at a time from a [`JobStore`], runs the handler
//! registered for its type under a deadline, and applies the retry policy.
//! When the deadline passes the job's cancellation token is set and the
//! handler gets a grace period to return before it is dropped. Retries:
//! a failed attempt goes back to pending until `attempts >= max_attempts`,
//! after which the job is failed with the error text as its result.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

use crate::models::job::Job;
use crate::services::queue::{JobStore, QueueError};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Cooperative cancellation flag shared between the worker and a handler.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a handler gets for one attempt of a job.
pub struct JobContext {
    job: Job,
    store: Arc<dyn JobStore>,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn new(job: Job, store: Arc<dyn JobStore>, cancel: CancellationToken) -> Self {
        Self { job, store, cancel }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.job.payload.clone())
    }

    /// Record progress (0-100). A failed write is logged and otherwise ignored.
    pub async fn report_progress(&self, progress: i32) {
        if let Err(e) = self.store.update_progress(self.job.id, progress).await {
            tracing::warn!(job_id = %self.job.id, progress, error = %e, "Failed to record job progress");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Executes jobs of one type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> &'static str;

    /// Run one attempt. The returned value becomes the job's result.
    async fn execute(&self, ctx: &JobContext) -> Result<serde_json::Value, HandlerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("job exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty queue.
    pub poll_interval: Duration,
    /// Upper bound on a single handler run.
    pub deadline: Duration,
    /// How long a cancelled handler may take to wind down before it is dropped.
    pub cancel_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            deadline: Duration::from_secs(300),
            cancel_grace: Duration::from_secs(5),
        }
    }
}

/// How a claimed job ended up after one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retried,
    Failed,
}

pub struct Worker {
    store: Arc<dyn JobStore>,
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(store: Arc<dyn JobStore>, config: WorkerConfig) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            config,
        }
    }

    pub fn register(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(handler.job_type(), handler);
        self
    }

    /// Poll until `shutdown` turns true. A job in flight is finished first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            handlers = ?self.handlers.keys().collect::<Vec<_>>(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => tracing::trace!("No jobs available, sleeping"),
                Err(e) => tracing::error!(error = %e, "Error processing job, will retry"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Claim and run the next job. `Ok(None)` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<(Uuid, JobOutcome)>, QueueError> {
        let Some(job) = self.store.claim_next().await? else {
            return Ok(None);
        };
        metrics::counter!("jobs_claimed_total").increment(1);

        let job_id = job.id;
        let outcome = self.execute(job).await?;
        Ok(Some((job_id, outcome)))
    }

    async fn execute(&self, job: Job) -> Result<JobOutcome, QueueError> {
        let job_id = job.id;
        let job_type = job.job_type.clone();
        let (attempts, max_attempts) = (job.attempts, job.max_attempts);

        let Some(handler) = self.handlers.get(job_type.as_str()).cloned() else {
            let err = WorkerError::UnknownJobType(job_type.clone());
            tracing::error!(job_id = %job_id, job_type = %job_type, "No handler registered");
            self.store.fail(job_id, &err.to_string()).await?;
            metrics::counter!("jobs_failed_total").increment(1);
            return Ok(JobOutcome::Failed);
        };

        tracing::info!(
            job_id = %job_id,
            job_type = %job_type,
            attempt = attempts,
            max_attempts,
            "Processing job"
        );

        let cancel = CancellationToken::new();
        let ctx = JobContext::new(job, Arc::clone(&self.store), cancel.clone());
        let start = Instant::now();

        let mut run = handler.execute(&ctx);
        let result = tokio::select! {
            result = &mut run => result,
            _ = tokio::time::sleep(self.config.deadline) => {
                cancel.cancel();
                tracing::warn!(
                    job_id = %job_id,
                    deadline_ms = self.config.deadline.as_millis() as u64,
                    "Job deadline reached, cancelling"
                );
                // A handler still running after the grace period is dropped,
                // along with any child process it owns.
                match tokio::time::timeout(self.config.cancel_grace, &mut run).await {
                    Ok(result) => result,
                    Err(_) => Err(Box::new(WorkerError::DeadlineExceeded(self.config.deadline)) as HandlerError),
                }
            }
        };
        let elapsed = start.elapsed();
        metrics::histogram!("job_duration_seconds").record(elapsed.as_secs_f64());

        match result {
            Ok(value) => {
                self.store.complete(job_id, value).await?;
                metrics::counter!("jobs_completed_total").increment(1);
                tracing::info!(
                    job_id = %job_id,
                    duration_ms = elapsed.as_millis() as u64,
                    "Job completed successfully"
                );
                Ok(JobOutcome::Completed)
            }
            Err(e) if attempts >= max_attempts => {
                let message = e.to_string();
                self.store.fail(job_id, &message).await?;
                metrics::counter!("jobs_failed_total").increment(1);
                tracing::warn!(
                    job_id = %job_id,
                    attempt = attempts,
                    error = %message,
                    "Job failed after max attempts"
                );
                Ok(JobOutcome::Failed)
            }
            Err(e) => {
                let message = e.to_string();
                self.store.retry(job_id, &message).await?;
                metrics::counter!("jobs_retried_total").increment(1);
                tracing::info!(
                    job_id = %job_id,
                    attempt = attempts,
                    error = %message,
                    "Job re-queued for retry"
                );
                Ok(JobOutcome::Retried)
            }
        }
    }
}

/// A shutdown flag for [`Worker::run`], flipped by Ctrl-C or SIGTERM.
pub fn shutdown_on_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = tx.send(true);
    });
    rx
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
