pub mod appwrite;
pub mod asset_url;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use appwrite::AppwriteStorage;
pub use asset_url::{generate_file_id, AssetUrlCodec};
pub use memory::MemoryObjectStore;

/// Errors from the object storage service
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage service rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Storage service returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// An in-memory file ready to be sent to the object store.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Remote descriptor returned after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The file did not exist. Cleanup callers treat this as success.
    Missing,
}

/// Binary asset service used for entity images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `upload` under `file_id`. Either the whole file is stored or
    /// an error is returned and nothing is visible.
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        upload: &FileUpload,
    ) -> Result<StoredFile, StorageError>;

    /// Delete a file. Deleting an unknown id yields `DeleteOutcome::Missing`.
    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<DeleteOutcome, StorageError>;
}
