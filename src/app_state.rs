use sqlx::PgPool;
use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::services::{
    encryption::EncryptionService,
    extractor::PdfToText,
    parse_job::ParseStatementHandler,
    parser::StatementParser,
    queue::JobStore,
    review::ReviewService,
    storage::{DocumentStorage, FileStore, StorageError},
    worker::Worker,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub review: Arc<ReviewService>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        storage: Arc<DocumentStorage>,
        jobs: Arc<dyn JobStore>,
        max_attempts: i32,
    ) -> Self {
        let review = ReviewService::new(db.clone(), storage, jobs, max_attempts);
        Self {
            db,
            review: Arc::new(review),
        }
    }
}

/// Build encrypted statement storage on the configured backend.
pub fn document_storage(config: &AppConfig) -> Result<DocumentStorage, StorageError> {
    let encryption = EncryptionService::new(&config.encryption_key)?;

    let files = match config.storage_backend {
        StorageBackend::Local => {
            tracing::info!(root = %config.storage_dir.display(), "Using local statement storage");
            FileStore::local(&config.storage_dir)
        }
        StorageBackend::R2 => {
            let r2 = config
                .r2_settings()
                .map_err(|e| StorageError::Config(e.to_string()))?;
            tracing::info!(bucket = r2.bucket, "Using R2 statement storage");
            FileStore::r2(r2.bucket, r2.endpoint, r2.access_key, r2.secret_key)?
        }
    };

    Ok(DocumentStorage::new(
        files,
        Arc::new(encryption),
        &config.scratch_dir,
    ))
}

/// A worker with the statement parse handler registered.
pub fn statement_worker(
    config: &AppConfig,
    db: PgPool,
    storage: Arc<DocumentStorage>,
    jobs: Arc<dyn JobStore>,
) -> Worker {
    let parser = StatementParser::new(Arc::new(PdfToText::new(config.pdftotext_path.clone())));
    let handler = ParseStatementHandler::new(db, storage, parser);
    Worker::new(jobs, config.worker_config()).register(Arc::new(handler))
}
