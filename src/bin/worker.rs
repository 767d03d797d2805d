use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use statement_recon::{
    app_state,
    config::AppConfig,
    db::{self, queries::PgJobStore},
    services::{queue::JobStore, worker::shutdown_on_signal},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting statement parse worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let storage = Arc::new(
        app_state::document_storage(&config).expect("Failed to initialize statement storage"),
    );
    let pg_jobs = PgJobStore::new(db_pool.clone());
    match pg_jobs.pending_count().await {
        Ok(pending) => tracing::info!(pending, "Worker ready"),
        Err(e) => tracing::warn!(error = %e, "Could not count pending jobs"),
    }
    let jobs: Arc<dyn JobStore> = Arc::new(pg_jobs);

    let worker = app_state::statement_worker(&config, db_pool, storage, jobs);
    worker.run(shutdown_on_signal()).await;
}
