use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Converts a stored statement document into layout-preserving plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Runs `pdftotext -layout <path> -` and captures stdout.
///
/// Plain `.txt` files are returned verbatim so fixtures and pre-extracted
/// statements go through the same path.
#[derive(Debug, Clone)]
pub struct PdfToText {
    program: String,
}

impl PdfToText {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdfToText {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

fn is_plain_text(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

#[async_trait]
impl TextExtractor for PdfToText {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if is_plain_text(path) {
            return tokio::fs::read_to_string(path).await.map_err(ExtractError::Read);
        }

        // The child dies with the future when the job deadline drops it.
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }

        tracing::debug!(path = %path.display(), chars = text.len(), "Extracted statement text");
        Ok(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Text extraction exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Text extraction produced no output")]
    Empty,

    #[error("Failed to read text file: {0}")]
    Read(#[source] std::io::Error),
}
