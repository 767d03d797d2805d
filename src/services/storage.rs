use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::statement::StatementPeriod;
use crate::services::encryption::{EncryptionError, EncryptionService};

/// Where sealed statement files live.
pub enum FileStore {
    /// A directory on local disk.
    Local { root: PathBuf },
    /// A Cloudflare R2 bucket (S3-compatible).
    R2 { bucket: Box<Bucket> },
}

impl FileStore {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        FileStore::Local { root: root.into() }
    }

    pub fn r2(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::Config(e.to_string()))?;
        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(FileStore::R2 { bucket })
    }

    fn local_path(root: &Path, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(root.join(relative))
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        match self {
            FileStore::Local { root } => {
                let path = Self::local_path(root, key)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, data).await?;
            }
            FileStore::R2 { bucket } => {
                bucket
                    .put_object_with_content_type(key, data, "application/octet-stream")
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match self {
            FileStore::Local { root } => {
                let path = Self::local_path(root, key)?;
                tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
                    _ => StorageError::Io(e),
                })
            }
            FileStore::R2 { bucket } => {
                let response = bucket.get_object(key).await?;
                Ok(response.to_vec())
            }
        }
    }

    /// Remove a stored file. Removing a missing file is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            FileStore::Local { root } => {
                let path = Self::local_path(root, key)?;
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(StorageError::Io(e)),
                }
            }
            FileStore::R2 { bucket } => {
                bucket.delete_object(key).await?;
                Ok(())
            }
        }
    }
}

/// Encrypted statement storage plus decrypted scratch copies for extraction.
pub struct DocumentStorage {
    files: FileStore,
    encryption: Arc<EncryptionService>,
    scratch_dir: PathBuf,
}

impl DocumentStorage {
    pub fn new(files: FileStore, encryption: Arc<EncryptionService>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            files,
            encryption,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Storage key for a statement upload, e.g. `statements/2025-12/<id>.pdf`.
    pub fn statement_key(period: StatementPeriod, statement_id: Uuid, original_filename: &str) -> String {
        format!("statements/{period}/{statement_id}.{}", file_extension(original_filename))
    }

    pub async fn store(&self, key: &str, plaintext: &[u8]) -> Result<(), StorageError> {
        let sealed = self.encryption.encrypt(plaintext)?;
        self.files.put(key, &sealed).await?;
        tracing::debug!(key = %key, bytes = plaintext.len(), "Stored sealed statement");
        Ok(())
    }

    pub async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let sealed = self.files.get(key).await?;
        Ok(self.encryption.decrypt(&sealed)?)
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.files.delete(key).await
    }

    /// Write a decrypted copy to the scratch directory. The copy is removed
    /// when the returned handle is dropped.
    pub async fn materialize(&self, key: &str) -> Result<ScratchFile, StorageError> {
        let plaintext = self.load(key).await?;
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let path = self
            .scratch_dir
            .join(format!("{}.{}", Uuid::new_v4(), file_extension(key)));
        tokio::fs::write(&path, &plaintext).await?;
        Ok(ScratchFile { path })
    }
}

/// A decrypted statement on local disk.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file");
            }
        }
    }
}

/// Lower-cased alphanumeric extension of a file name, `pdf` when absent.
fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "pdf".to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("File I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored file not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("statement-recon-{label}-{}", Uuid::new_v4()))
    }

    fn storage(root: &Path, scratch: &Path) -> DocumentStorage {
        let encryption = Arc::new(EncryptionService::from_key_bytes(&[3u8; 32]).unwrap());
        DocumentStorage::new(FileStore::local(root), encryption, scratch)
    }

    #[test]
    fn test_statement_key_layout() {
        let id = Uuid::nil();
        let period = StatementPeriod::new(2025, 12).unwrap();
        assert_eq!(
            DocumentStorage::statement_key(period, id, "View Statement.PDF"),
            format!("statements/2025-12/{id}.pdf")
        );
        assert!(DocumentStorage::statement_key(period, id, "statement").ends_with(".pdf"));
        assert!(DocumentStorage::statement_key(period, id, "dec.txt").ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_files_are_sealed_on_disk_and_scratch_is_cleaned() {
        let root = temp_dir("store");
        let scratch = temp_dir("scratch");
        let docs = storage(&root, &scratch);

        docs.store("statements/2025-12/a.txt", b"Statement Period:").await.unwrap();
        let on_disk = tokio::fs::read(root.join("statements/2025-12/a.txt")).await.unwrap();
        assert_ne!(on_disk, b"Statement Period:");

        let scratch_path = {
            let file = docs.materialize("statements/2025-12/a.txt").await.unwrap();
            assert_eq!(file.path().extension().unwrap(), "txt");
            assert_eq!(tokio::fs::read(file.path()).await.unwrap(), b"Statement Period:");
            file.path().to_path_buf()
        };
        assert!(!scratch_path.exists());

        docs.delete("statements/2025-12/a.txt").await.unwrap();
        docs.delete("statements/2025-12/a.txt").await.unwrap();
        assert!(matches!(
            docs.load("statements/2025-12/a.txt").await,
            Err(StorageError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(&root).await;
        let _ = tokio::fs::remove_dir_all(&scratch).await;
    }

    #[tokio::test]
    async fn test_local_keys_cannot_escape_root() {
        let root = temp_dir("escape");
        let files = FileStore::local(&root);
        assert!(matches!(
            files.put("../outside.pdf", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(files.get("/etc/passwd").await, Err(StorageError::InvalidKey(_))));
    }
}
