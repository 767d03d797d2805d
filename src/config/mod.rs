use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::job::DEFAULT_MAX_ATTEMPTS;
use crate::services::worker::WorkerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    R2,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the worker binary.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// AES-256-GCM key for statement files at rest (base64-encoded, 32 bytes)
    pub encryption_key: String,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// Root directory for the local backend
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Where decrypted copies are written for text extraction
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    pub r2_bucket: Option<String>,
    pub r2_endpoint: Option<String>,
    pub r2_access_key: Option<String>,
    pub r2_secret_key: Option<String>,

    #[serde(default = "default_pdftotext_path")]
    pub pdftotext_path: String,

    #[serde(default = "default_poll_interval_secs")]
    pub worker_poll_interval_secs: u64,

    #[serde(default = "default_job_deadline_secs")]
    pub job_deadline_secs: u64,

    /// Time a cancelled job gets to stop on its own after the deadline
    #[serde(default = "default_job_cancel_grace_secs")]
    pub job_cancel_grace_secs: u64,

    #[serde(default = "default_job_max_attempts")]
    pub job_max_attempts: i32,

    /// Run the job worker inside the server process
    #[serde(default = "default_embedded_worker")]
    pub embedded_worker: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Local
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data/statements")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("statement-recon")
}

fn default_pdftotext_path() -> String {
    "pdftotext".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_job_deadline_secs() -> u64 {
    300
}

fn default_job_cancel_grace_secs() -> u64 {
    5
}

fn default_job_max_attempts() -> i32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_embedded_worker() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
#[error("R2 storage selected but {0} is not set")]
pub struct MissingR2Setting(pub &'static str);

/// Connection settings for the R2 backend.
pub struct R2Settings<'a> {
    pub bucket: &'a str,
    pub endpoint: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_secs(self.worker_poll_interval_secs.max(1)),
            deadline: Duration::from_secs(self.job_deadline_secs.max(1)),
            cancel_grace: Duration::from_secs(self.job_cancel_grace_secs),
        }
    }

    pub fn r2_settings(&self) -> Result<R2Settings<'_>, MissingR2Setting> {
        fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, MissingR2Setting> {
            value.as_deref().filter(|v| !v.is_empty()).ok_or(MissingR2Setting(name))
        }
        Ok(R2Settings {
            bucket: require(&self.r2_bucket, "R2_BUCKET")?,
            endpoint: require(&self.r2_endpoint, "R2_ENDPOINT")?,
            access_key: require(&self.r2_access_key, "R2_ACCESS_KEY")?,
            secret_key: require(&self.r2_secret_key, "R2_SECRET_KEY")?,
        })
    }
}
