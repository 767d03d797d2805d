//! Worker retry, deadline and claim behaviour against the in-memory queue.
//!
//! Run with: cargo test --test worker_test

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use statement_recon::models::job::JobStatus;
use statement_recon::services::queue::{JobStore, MemoryJobStore};
use statement_recon::services::worker::{
    HandlerError, JobContext, JobHandler, JobOutcome, Worker, WorkerConfig,
};

const TEST_JOB: &str = "test_job";

fn fast_config() -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_secs(5),
        cancel_grace: Duration::from_millis(200),
    }
}

/// Fails every attempt and counts how often it ran.
#[derive(Default)]
struct AlwaysFails {
    calls: AtomicUsize,
}

#[async_trait]
impl JobHandler for AlwaysFails {
    fn job_type(&self) -> &'static str {
        TEST_JOB
    }

    async fn execute(&self, _ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Err(format!("attempt {n} failed").into())
    }
}

/// Echoes its payload back after reporting progress.
struct Echo;

#[async_trait]
impl JobHandler for Echo {
    fn job_type(&self) -> &'static str {
        TEST_JOB
    }

    async fn execute(&self, ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        ctx.report_progress(50).await;
        let payload: serde_json::Value = ctx.payload()?;
        Ok(json!({ "echo": payload, "attempt": ctx.job().attempts }))
    }
}

/// Fails the first attempt only.
#[derive(Default)]
struct FlakyOnce {
    calls: AtomicUsize,
}

#[async_trait]
impl JobHandler for FlakyOnce {
    fn job_type(&self) -> &'static str {
        TEST_JOB
    }

    async fn execute(&self, _ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("transient failure".into());
        }
        Ok(json!("ok"))
    }
}

struct Sleeps;

#[async_trait]
impl JobHandler for Sleeps {
    fn job_type(&self) -> &'static str {
        TEST_JOB
    }

    async fn execute(&self, _ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(json!(null))
    }
}

/// Works in small steps until told to stop, like the statement parse job.
#[derive(Default)]
struct StopsWhenCancelled {
    saw_cancel: AtomicBool,
}

#[async_trait]
impl JobHandler for StopsWhenCancelled {
    fn job_type(&self) -> &'static str {
        TEST_JOB
    }

    async fn execute(&self, ctx: &JobContext) -> Result<serde_json::Value, HandlerError> {
        for step in 0.. {
            if ctx.is_cancelled() {
                self.saw_cancel.store(true, Ordering::SeqCst);
                return Err(format!("cancelled after {step} steps").into());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(json!(null))
    }
}

async fn drain(worker: &Worker) -> Vec<JobOutcome> {
    let mut outcomes = Vec::new();
    while let Some((_, outcome)) = worker.process_next().await.expect("queue error") {
        outcomes.push(outcome);
    }
    outcomes
}

#[tokio::test]
async fn test_failing_job_is_claimed_exactly_max_attempts_times() {
    let store = Arc::new(MemoryJobStore::new());
    let handler = Arc::new(AlwaysFails::default());
    let worker = Worker::new(store.clone(), fast_config()).register(handler.clone());

    let job_id = store.enqueue(TEST_JOB, json!({}), 3).await.unwrap();
    let outcomes = drain(&worker).await;

    assert_eq!(
        outcomes,
        vec![JobOutcome::Retried, JobOutcome::Retried, JobOutcome::Failed]
    );
    assert_eq!(handler.calls.load(Ordering::SeqCst), 3);

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 3);
    assert_eq!(job.error.as_deref(), Some("attempt 3 failed"));
    assert_eq!(job.result, Some(json!("attempt 3 failed")));
}

#[tokio::test]
async fn test_successful_job_records_result_and_progress() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = Worker::new(store.clone(), fast_config()).register(Arc::new(Echo));

    let job_id = store.enqueue(TEST_JOB, json!({"statement": 7}), 3).await.unwrap();
    let processed = worker.process_next().await.unwrap();
    assert_eq!(processed, Some((job_id, JobOutcome::Completed)));

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.result, Some(json!({"echo": {"statement": 7}, "attempt": 1})));
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_retry_then_success() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = Worker::new(store.clone(), fast_config()).register(Arc::new(FlakyOnce::default()));

    let job_id = store.enqueue(TEST_JOB, json!({}), 3).await.unwrap();
    assert_eq!(drain(&worker).await, vec![JobOutcome::Retried, JobOutcome::Completed]);

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 2);
    assert!(job.error.is_none());
}

#[tokio::test]
async fn test_unknown_job_type_fails_without_retry() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = Worker::new(store.clone(), fast_config()).register(Arc::new(Echo));

    let job_id = store.enqueue("export_ledger", json!({}), 3).await.unwrap();
    assert_eq!(drain(&worker).await, vec![JobOutcome::Failed]);

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 1);
    assert!(job.error.unwrap().contains("unknown job type"));
}

#[tokio::test]
async fn test_deadline_fails_slow_job() {
    let store = Arc::new(MemoryJobStore::new());
    let config = WorkerConfig {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_millis(50),
        cancel_grace: Duration::from_millis(50),
    };
    let worker = Worker::new(store.clone(), config).register(Arc::new(Sleeps));

    let job_id = store.enqueue(TEST_JOB, json!({}), 1).await.unwrap();
    let started = std::time::Instant::now();
    assert_eq!(drain(&worker).await, vec![JobOutcome::Failed]);
    assert!(started.elapsed() < Duration::from_secs(5));

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("deadline"));
}

#[tokio::test]
async fn test_deadline_signals_cancellation_to_running_handler() {
    let store = Arc::new(MemoryJobStore::new());
    let config = WorkerConfig {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_millis(50),
        cancel_grace: Duration::from_secs(2),
    };
    let handler = Arc::new(StopsWhenCancelled::default());
    let worker = Worker::new(store.clone(), config).register(handler.clone());

    let job_id = store.enqueue(TEST_JOB, json!({}), 1).await.unwrap();
    let started = std::time::Instant::now();
    assert_eq!(drain(&worker).await, vec![JobOutcome::Failed]);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(handler.saw_cancel.load(Ordering::SeqCst));

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().starts_with("cancelled after"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_have_one_winner() {
    let store = Arc::new(MemoryJobStore::new());
    let job_id = store.enqueue(TEST_JOB, json!({}), 3).await.unwrap();

    let claims = (0..16).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.claim_next().await })
    });
    let results = futures::future::join_all(claims).await;

    let winners: Vec<_> = results
        .into_iter()
        .filter_map(|joined| joined.expect("task panicked").expect("claim failed"))
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].id, job_id);
    assert_eq!(winners[0].attempts, 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let store = Arc::new(MemoryJobStore::new());
    let worker = Worker::new(store.clone(), fast_config()).register(Arc::new(Echo));
    let job_id = store.enqueue(TEST_JOB, json!({}), 3).await.unwrap();

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { worker.run(rx).await });

    let mut done = false;
    for _ in 0..100 {
        let job = store.get(job_id).await.unwrap().unwrap();
        if job.status.is_terminal() {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(done, "job never finished");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
