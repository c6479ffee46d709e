//! In-process stores, used by default and in tests.
//! Contents are lost when the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use cardlister_core::{BlobRef, SessionRecord, StorageBackend};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::keys::{generate_blob_key, session_blob_prefix, validate_key};
use crate::traits::{BlobStore, SessionStore, StorageError, StorageResult};

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        session_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<BlobRef> {
        let key = generate_blob_key(session_id, filename);
        let size = data.len();
        self.blobs.write().await.insert(key.clone(), data);

        tracing::debug!(
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            "Memory blob stored"
        );

        Ok(BlobRef::new(key))
    }

    async fn get(&self, blob: &BlobRef) -> StorageResult<Bytes> {
        validate_key(blob.as_str())?;
        self.blobs
            .read()
            .await
            .get(blob.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(blob.to_string()))
    }

    async fn delete(&self, blob: &BlobRef) -> StorageResult<()> {
        validate_key(blob.as_str())?;
        self.blobs.write().await.remove(blob.as_str());
        Ok(())
    }

    async fn exists(&self, blob: &BlobRef) -> StorageResult<bool> {
        validate_key(blob.as_str())?;
        Ok(self.blobs.read().await.contains_key(blob.as_str()))
    }

    async fn delete_session(&self, session_id: Uuid) -> StorageResult<usize> {
        let prefix = session_blob_prefix(session_id);
        let mut blobs = self.blobs.write().await;
        let before = blobs.len();
        blobs.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - blobs.len();

        tracing::debug!(
            session_id = %session_id,
            removed = removed,
            "Memory session blobs deleted"
        );
        Ok(removed)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Keeps snapshots as serialized JSON so loads go through the same
/// validation as records read from disk.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<Uuid, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        let json = record
            .to_json()
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        self.records.write().await.insert(record.session_id, json);
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> StorageResult<Option<SessionRecord>> {
        let records = self.records.read().await;
        match records.get(&session_id) {
            Some(json) => SessionRecord::from_json(json)
                .map(Some)
                .map_err(|e| StorageError::InvalidRecord(e.to_string())),
            None => Ok(None),
        }
    }

    async fn delete(&self, session_id: Uuid) -> StorageResult<()> {
        self.records.write().await.remove(&session_id);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
