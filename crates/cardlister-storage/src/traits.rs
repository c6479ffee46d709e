//! Storage abstraction traits
//!
//! `BlobStore` holds photo payloads while a session is in progress;
//! `SessionStore` holds the session snapshots used to resume after a reload.

use async_trait::async_trait;
use bytes::Bytes;
use cardlister_core::{BlobRef, IntakeError, RejectReason, SessionRecord, StorageBackend};
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Stored session is invalid: {0}")]
    InvalidRecord(String),

    #[error("Photo rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("Session refused the photo: {0}")]
    Intake(IntakeError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<IntakeError> for StorageError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::ItemRejected(reason) => StorageError::Rejected(reason),
            other => StorageError::Intake(other),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Photo payload store
///
/// **Key format:** `intake/{session_id}/{uuid}.{ext}`. The returned `BlobRef`
/// wraps the key; callers treat it as opaque.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a payload under a fresh key scoped to the session
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<BlobRef>;

    async fn get(&self, blob: &BlobRef) -> StorageResult<Bytes>;

    /// Delete a payload. Deleting a missing blob is not an error.
    async fn delete(&self, blob: &BlobRef) -> StorageResult<()>;

    async fn exists(&self, blob: &BlobRef) -> StorageResult<bool>;

    /// Delete every payload staged for a session; returns how many were removed
    async fn delete_session(&self, session_id: Uuid) -> StorageResult<usize>;

    fn backend_type(&self) -> StorageBackend;
}

/// Session snapshot store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the snapshot for `record.session_id`
    async fn save(&self, record: &SessionRecord) -> StorageResult<()>;

    /// Load and validate a snapshot; `None` when nothing was saved
    async fn load(&self, session_id: Uuid) -> StorageResult<Option<SessionRecord>>;

    async fn delete(&self, session_id: Uuid) -> StorageResult<()>;

    fn backend_type(&self) -> StorageBackend;
}
