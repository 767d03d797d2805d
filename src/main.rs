use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use statement_recon::{
    app_state::{self, AppState},
    config::AppConfig,
    db::{self, queries::PgJobStore},
    routes,
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

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing statement-recon server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let storage = Arc::new(
        app_state::document_storage(&config).expect("Failed to initialize statement storage"),
    );
    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool.clone()));

    let state = AppState::new(
        db_pool.clone(),
        Arc::clone(&storage),
        Arc::clone(&jobs),
        config.job_max_attempts,
    );

    let shutdown = shutdown_on_signal();

    let worker_handle = if config.embedded_worker {
        tracing::info!("Starting embedded job worker");
        let worker = app_state::statement_worker(&config, db_pool.clone(), storage, jobs);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move { worker.run(shutdown).await }))
    } else {
        tracing::info!("Embedded worker disabled, run the worker binary separately");
        None
    };

    let app = routes::router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    let mut server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .expect("Server error");

    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Embedded worker task ended abnormally");
        }
    }

    tracing::info!("Server stopped");
}
