//! Upload Storage
//!
//! Binary uploads (voice notes, images, files) are written to a storage
//! backend that returns a public URL. The message that references an upload
//! stores that URL with the original file name appended as a `name` query
//! parameter so clients can label downloads.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

/// Route prefix under which stored files are served
pub const UPLOAD_MOUNT: &str = "/uploads";

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A file received from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Public URL of the stored object
    pub url: String,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn store(&self, file: UploadedFile) -> Result<StoredFile, StorageError>;
}

/// Stores uploads in a local directory served by the HTTP server
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    dir: PathBuf,
    public_base_url: Option<String>,
}

impl LocalDiskStorage {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn public_url(&self, stored_name: &str) -> String {
        format!(
            "{}{}/{}",
            self.public_base_url.as_deref().unwrap_or(""),
            UPLOAD_MOUNT,
            stored_name
        )
    }
}

#[async_trait]
impl Storage for LocalDiskStorage {
    async fn store(&self, file: UploadedFile) -> Result<StoredFile, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let stored_name = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            safe_extension(&file.file_name)
        );
        tokio::fs::write(self.dir.join(&stored_name), &file.bytes).await?;
        tracing::debug!(
            "[Storage] Stored {} ({} bytes) as {}",
            file.file_name,
            file.bytes.len(),
            stored_name
        );
        Ok(StoredFile {
            url: self.public_url(&stored_name),
        })
    }
}

/// `.ext` of the original name if it is short and alphanumeric, else empty
fn safe_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Append the original file name to a stored URL
pub fn with_original_name(url: &str, file_name: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}name={}", url, separator, urlencoding::encode(file_name))
}
