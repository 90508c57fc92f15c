//! Storage collaborator
//!
//! The pipeline persists accepted files through the [`AttachmentStore`]
//! trait, keeping the concrete record storage pluggable. Disk storage is
//! the production backend; the in-memory store backs tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::model::{Attachment, UploadedFile};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage collaborator for attachment records
///
/// Implementations are responsible for their own concurrency safety,
/// including collision-free disk filename assignment.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Durably store the file bytes and produce the attachment record
    async fn create(
        &self,
        file: &UploadedFile,
        fields: &HashMap<String, String>,
    ) -> StorageResult<Attachment>;

    /// Public URL for a stored attachment, relative to the service root
    fn url_of(&self, attachment: &Attachment) -> String;
}

/// Generate a collision-free disk filename, keeping the original extension
pub fn generate_disk_filename(filename: &str) -> String {
    let uuid = Uuid::new_v4();
    let ext = Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    if ext.is_empty() {
        format!("{}", uuid)
    } else {
        format!("{}.{}", uuid, ext)
    }
}

fn calculate_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn build_record(
    file: &UploadedFile,
    disk_filename: String,
    url: String,
    fields: &HashMap<String, String>,
) -> Attachment {
    Attachment {
        id: Uuid::new_v4(),
        name: file.filename.clone(),
        disk_filename,
        size: file.size(),
        content_type: file.effective_content_type(),
        digest: calculate_digest(&file.data),
        url,
        fields: fields.clone(),
        created_at: Utc::now(),
    }
}

/// Local filesystem storage
pub struct DiskAttachmentStore {
    /// Root directory for stored files
    root: PathBuf,
    /// Public path prefix under which stored files are served
    url_prefix: String,
}

impl DiskAttachmentStore {
    pub fn new(root: impl AsRef<Path>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Create storage rooted in a temp directory
    pub fn temp() -> std::io::Result<Self> {
        let dir = std::env::temp_dir().join("summernote-attachments");
        std::fs::create_dir_all(&dir)?;
        Ok(Self::new(dir, "/media/summernote"))
    }

    /// Resolve a disk filename to a full path
    fn resolve_path(&self, disk_filename: &str) -> StorageResult<PathBuf> {
        // Prevent directory traversal
        if disk_filename.contains("..")
            || disk_filename.starts_with('/')
            || disk_filename.starts_with('\\')
        {
            return Err(StorageError::InvalidPath(disk_filename.to_string()));
        }

        Ok(self.root.join(disk_filename))
    }

    fn relative_url(&self, disk_filename: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), disk_filename)
    }
}

#[async_trait]
impl AttachmentStore for DiskAttachmentStore {
    async fn create(
        &self,
        file: &UploadedFile,
        fields: &HashMap<String, String>,
    ) -> StorageResult<Attachment> {
        let disk_filename = generate_disk_filename(&file.filename);
        let path = self.resolve_path(&disk_filename)?;

        fs::create_dir_all(&self.root).await?;

        let mut out = fs::File::create(&path).await?;
        out.write_all(&file.data).await?;
        out.sync_all().await?;

        debug!(path = ?path, size = file.size(), "File stored");

        let url = self.relative_url(&disk_filename);
        Ok(build_record(file, disk_filename, url, fields))
    }

    fn url_of(&self, attachment: &Attachment) -> String {
        self.relative_url(&attachment.disk_filename)
    }
}

/// In-memory storage for testing
pub struct MemoryAttachmentStore {
    files: parking_lot::RwLock<HashMap<String, Bytes>>,
    url_prefix: String,
}

impl Default for MemoryAttachmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self {
            files: parking_lot::RwLock::new(HashMap::new()),
            url_prefix: "/memory".to_string(),
        }
    }

    /// Number of files persisted so far
    pub fn saved_count(&self) -> usize {
        self.files.read().len()
    }

    /// Retrieve stored bytes by disk filename
    pub fn get(&self, disk_filename: &str) -> Option<Bytes> {
        self.files.read().get(disk_filename).cloned()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn create(
        &self,
        file: &UploadedFile,
        fields: &HashMap<String, String>,
    ) -> StorageResult<Attachment> {
        let disk_filename = generate_disk_filename(&file.filename);

        self.files
            .write()
            .insert(disk_filename.clone(), file.data.clone());

        let url = format!("{}/{}", self.url_prefix, disk_filename);
        Ok(build_record(file, disk_filename, url, fields))
    }

    fn url_of(&self, attachment: &Attachment) -> String {
        format!("{}/{}", self.url_prefix, attachment.disk_filename)
    }
}
