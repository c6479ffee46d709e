use crate::keys::{generate_blob_key, session_blob_prefix, session_record_key, validate_key};
use crate::traits::{BlobStore, SessionStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use cardlister_core::{BlobRef, SessionRecord, StorageBackend};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Resolve a key under `base_path`, refusing anything that would land outside it.
fn key_to_path(base_path: &Path, key: &str) -> StorageResult<PathBuf> {
    validate_key(key)?;

    let path = base_path.join(key);

    let base_canonical = base_path.canonicalize().map_err(|e| {
        StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
    })?;

    if let Ok(canonical) = path.canonicalize() {
        if canonical.strip_prefix(&base_canonical).is_err() {
            return Err(StorageError::InvalidKey(format!(
                "{} resolves outside storage directory",
                key
            )));
        }
    }

    Ok(path)
}

async fn create_base_dir(base_path: &Path) -> StorageResult<()> {
    fs::create_dir_all(base_path).await.map_err(|e| {
        StorageError::ConfigError(format!(
            "Failed to create storage directory {}: {}",
            base_path.display(),
            e
        ))
    })
}

async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut file = fs::File::create(path).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;

    file.write_all(data).await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
    })?;

    file.sync_all().await.map_err(|e| {
        StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;

    Ok(())
}

/// Local filesystem blob store
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path` (e.g. "/var/lib/cardlister"), creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        create_base_dir(&base_path).await?;
        Ok(LocalBlobStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<BlobRef> {
        let key = generate_blob_key(session_id, filename);
        let path = key_to_path(&self.base_path, &key)?;
        let start = std::time::Instant::now();

        ensure_parent_dir(&path).await?;
        write_synced(&path, &data).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            content_type = %content_type,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local blob stored"
        );

        Ok(BlobRef::new(key))
    }

    async fn get(&self, blob: &BlobRef) -> StorageResult<Bytes> {
        let path = key_to_path(&self.base_path, blob.as_str())?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(blob.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %blob,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local blob read"
        );

        Ok(Bytes::from(data))
    }

    async fn delete(&self, blob: &BlobRef) -> StorageResult<()> {
        let path = key_to_path(&self.base_path, blob.as_str())?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %blob, "Local blob deleted");
        Ok(())
    }

    async fn exists(&self, blob: &BlobRef) -> StorageResult<bool> {
        let path = key_to_path(&self.base_path, blob.as_str())?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete_session(&self, session_id: Uuid) -> StorageResult<usize> {
        let prefix = session_blob_prefix(session_id);
        let dir = key_to_path(&self.base_path, prefix.trim_end_matches('/'))?;

        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                removed += 1;
            }
        }

        fs::remove_dir_all(&dir).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        tracing::info!(session_id = %session_id, removed = removed, "Local session blobs deleted");
        Ok(removed)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Local filesystem session store. Snapshots are written to a temporary file
/// and renamed into place, so a crash never leaves a half-written record.
#[derive(Clone)]
pub struct LocalSessionStore {
    base_path: PathBuf,
}

impl LocalSessionStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        create_base_dir(&base_path).await?;
        Ok(LocalSessionStore { base_path })
    }
}

#[async_trait]
impl SessionStore for LocalSessionStore {
    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        let path = key_to_path(&self.base_path, &session_record_key(record.session_id))?;
        let json = record
            .to_json()
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        ensure_parent_dir(&path).await?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        write_synced(&tmp_path, json.as_bytes()).await?;

        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move session record into {}: {}",
                path.display(),
                e
            )));
        }

        tracing::debug!(
            session_id = %record.session_id,
            stage = %record.stage,
            items = record.items.len(),
            "Session record saved"
        );
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> StorageResult<Option<SessionRecord>> {
        let path = key_to_path(&self.base_path, &session_record_key(session_id))?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        SessionRecord::from_json(&json)
            .map(Some)
            .map_err(|e| StorageError::InvalidRecord(format!("{}: {}", path.display(), e)))
    }

    async fn delete(&self, session_id: Uuid) -> StorageResult<()> {
        let path = key_to_path(&self.base_path, &session_record_key(session_id))?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
