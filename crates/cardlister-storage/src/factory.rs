#[cfg(feature = "storage-local")]
use crate::{LocalBlobStore, LocalSessionStore};
use crate::{
    BlobStore, MemoryBlobStore, MemorySessionStore, SessionStore, StorageBackend, StorageError,
    StorageResult,
};
use cardlister_core::IntakeConfig;
use std::sync::Arc;

#[cfg(feature = "storage-local")]
fn local_storage_path(config: &IntakeConfig) -> StorageResult<&str> {
    config.local_storage_path.as_deref().ok_or_else(|| {
        StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
    })
}

/// Create the photo blob store selected by `STORAGE_BACKEND`
pub async fn create_blob_store(config: &IntakeConfig) -> StorageResult<Arc<dyn BlobStore>> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryBlobStore::new())),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let store = LocalBlobStore::new(local_storage_path(config)?).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Create the session snapshot store selected by `STORAGE_BACKEND`
pub async fn create_session_store(config: &IntakeConfig) -> StorageResult<Arc<dyn SessionStore>> {
    match config.storage_backend {
        StorageBackend::Memory => Ok(Arc::new(MemorySessionStore::new())),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let store = LocalSessionStore::new(local_storage_path(config)?).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
