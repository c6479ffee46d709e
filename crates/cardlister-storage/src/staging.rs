//! Photo staging
//!
//! Reading a photo's bytes is the slow part of intake. These helpers do that
//! I/O, park the payload in a `BlobStore`, and hand back a `RawPhoto` that
//! carries both the bytes and the `BlobRef`, ready for `add_item`.
//!
//! A payload is checked against the intake limits before it is written, and
//! `stage_and_add` deletes the blob again if the session refuses the photo.

use bytes::Bytes;
use cardlister_core::validation::{validate_content_type, validate_file_size, validate_photo};
use cardlister_core::{
    BlobRef, IntakeItem, IntakeLimits, ItemId, PhotoKind, QueuedItem, RawPhoto, RejectReason,
    StageOrchestrator,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use crate::traits::{BlobStore, SessionStore, StorageResult};

/// Validate an in-memory payload, store it, and describe it as a `RawPhoto`.
///
/// Nothing is written when the payload is empty, oversized, of an unlisted
/// type, or carries an unusable filename.
pub async fn stage_photo(
    store: &dyn BlobStore,
    limits: &IntakeLimits,
    session_id: Uuid,
    filename: &str,
    content_type: &str,
    kind: PhotoKind,
    data: Bytes,
) -> StorageResult<RawPhoto> {
    let photo = validate_photo(
        RawPhoto::new(filename, content_type, data).with_kind(kind),
        limits,
    )?;
    let blob = store
        .put(session_id, &photo.filename, &photo.mime_type, photo.data.clone())
        .await?;

    Ok(photo.with_blob(blob))
}

/// Read a payload from `reader` and stage it, refusing oversized or
/// unlisted content before anything is written to the store.
///
/// At most `max_file_size_bytes + 1` bytes are read, so a huge upload is cut
/// off as soon as it crosses the limit.
pub async fn stage_photo_from_reader<R>(
    store: &dyn BlobStore,
    limits: &IntakeLimits,
    session_id: Uuid,
    filename: &str,
    content_type: &str,
    kind: PhotoKind,
    reader: R,
) -> StorageResult<RawPhoto>
where
    R: AsyncRead + Unpin + Send,
{
    validate_content_type(content_type, &limits.allowed_content_types)?;

    let start = std::time::Instant::now();
    let mut buffer = Vec::new();
    reader
        .take(limits.max_file_size_bytes.saturating_add(1))
        .read_to_end(&mut buffer)
        .await?;

    if buffer.len() as u64 > limits.max_file_size_bytes {
        tracing::debug!(
            filename = %filename,
            max_bytes = limits.max_file_size_bytes,
            "Photo upload cut off at size limit"
        );
        return Err(RejectReason::TooLarge {
            size_bytes: buffer.len() as u64,
            max_bytes: limits.max_file_size_bytes,
        }
        .into());
    }
    validate_file_size(buffer.len() as u64, limits.max_file_size_bytes)?;

    tracing::debug!(
        filename = %filename,
        size_bytes = buffer.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Photo payload read"
    );

    stage_photo(
        store,
        limits,
        session_id,
        filename,
        content_type,
        kind,
        Bytes::from(buffer),
    )
    .await
}

/// Stage a photo and append it to the orchestrator's queue.
///
/// If the session refuses the photo (wrong stage, full queue) the staged blob
/// is deleted before the error is returned.
pub async fn stage_and_add(
    orchestrator: &mut StageOrchestrator,
    store: &dyn BlobStore,
    filename: &str,
    content_type: &str,
    kind: PhotoKind,
    data: Bytes,
) -> StorageResult<ItemId> {
    let limits = orchestrator.queue().limits().clone();
    let photo = stage_photo(
        store,
        &limits,
        orchestrator.session_id(),
        filename,
        content_type,
        kind,
        data,
    )
    .await?;
    let blob = photo.blob.clone();

    match orchestrator.add_item(photo) {
        Ok(id) => Ok(id),
        Err(err) => {
            if let Some(blob) = blob {
                store.delete(&blob).await?;
                tracing::debug!(blob = %blob, "Staged photo released after rejection");
            }
            Err(err.into())
        }
    }
}

/// Delete the blob behind a queued photo, e.g. after `remove_item`.
/// Returns whether a blob was referenced.
pub async fn release_item(store: &dyn BlobStore, queued: &QueuedItem) -> StorageResult<bool> {
    match staged_blob(queued) {
        Some(blob) => {
            store.delete(blob).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Reset the orchestrator and delete the blobs of every photo the reset
/// cleared from the queue. Returns the number of blobs deleted.
pub async fn reset_and_release(
    orchestrator: &mut StageOrchestrator,
    store: &dyn BlobStore,
) -> StorageResult<usize> {
    let blobs: Vec<BlobRef> = orchestrator
        .queue()
        .iter()
        .filter_map(staged_blob)
        .cloned()
        .collect();
    orchestrator.reset();

    for blob in &blobs {
        store.delete(blob).await?;
    }
    tracing::debug!(
        session_id = %orchestrator.session_id(),
        released_blobs = blobs.len(),
        "Staged photos released on reset"
    );
    Ok(blobs.len())
}

/// Drop everything stored for a finished or abandoned session.
/// Returns the number of blobs removed.
pub async fn purge_session(
    blobs: &dyn BlobStore,
    sessions: &dyn SessionStore,
    session_id: Uuid,
) -> StorageResult<usize> {
    let removed = blobs.delete_session(session_id).await?;
    sessions.delete(session_id).await?;
    tracing::info!(session_id = %session_id, removed_blobs = removed, "Session purged");
    Ok(removed)
}

fn staged_blob(queued: &QueuedItem) -> Option<&BlobRef> {
    match &queued.item {
        IntakeItem::RawPhoto(photo) => photo.blob.as_ref(),
        IntakeItem::CertificateLookup(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBlobStore, MemorySessionStore};
    use crate::traits::StorageError;

    #[tokio::test]
    async fn test_stage_photo_stores_payload() {
        let store = MemoryBlobStore::new();
        let session_id = Uuid::new_v4();

        let photo = stage_photo(
            &store,
            &IntakeLimits::default(),
            session_id,
            "slab.jpg",
            "image/jpeg",
            PhotoKind::GradedSlab,
            Bytes::from_static(b"slab bytes"),
        )
        .await
        .unwrap();

        assert_eq!(photo.size_bytes, 10);
        assert_eq!(photo.kind, PhotoKind::GradedSlab);
        let blob = photo.blob.clone().unwrap();
        assert_eq!(store.get(&blob).await.unwrap(), photo.data);
    }

    #[tokio::test]
    async fn test_reader_over_limit_is_rejected_before_storing() {
        let store = MemoryBlobStore::new();
        let limits = IntakeLimits {
            max_file_size_bytes: 16,
            ..IntakeLimits::default()
        };
        let payload = vec![0u8; 64];

        let result = stage_photo_from_reader(
            &store,
            &limits,
            Uuid::new_v4(),
            "big.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            payload.as_slice(),
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::Rejected(RejectReason::TooLarge { max_bytes: 16, .. }))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reader_with_unlisted_type_is_rejected() {
        let store = MemoryBlobStore::new();
        let result = stage_photo_from_reader(
            &store,
            &IntakeLimits::default(),
            Uuid::new_v4(),
            "anim.gif",
            "image/gif",
            PhotoKind::RawCard,
            &b"GIF89a"[..],
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::Rejected(RejectReason::UnsupportedType { .. }))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_reader_is_rejected() {
        let store = MemoryBlobStore::new();
        let result = stage_photo_from_reader(
            &store,
            &IntakeLimits::default(),
            Uuid::new_v4(),
            "empty.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            &b""[..],
        )
        .await;
        assert!(matches!(
            result,
            Err(StorageError::Rejected(RejectReason::EmptyFile))
        ));
    }

    #[tokio::test]
    async fn test_purge_session() {
        let blobs = MemoryBlobStore::new();
        let sessions = MemorySessionStore::new();
        let orchestrator = cardlister_core::StageOrchestrator::default();
        let record = orchestrator.to_record();
        let session_id = record.session_id;

        sessions.save(&record).await.unwrap();
        stage_photo(
            &blobs,
            &IntakeLimits::default(),
            session_id,
            "a.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"a"),
        )
        .await
        .unwrap();

        assert_eq!(purge_session(&blobs, &sessions, session_id).await.unwrap(), 1);
        assert!(blobs.is_empty().await);
        assert!(sessions.load(session_id).await.unwrap().is_none());
    }

    fn intake_orchestrator(limits: IntakeLimits) -> StageOrchestrator {
        let mut orchestrator = StageOrchestrator::new(limits);
        orchestrator.begin_link().unwrap();
        orchestrator.complete_link("acct-123").unwrap();
        orchestrator.start_intake().unwrap();
        orchestrator
    }

    #[tokio::test]
    async fn test_stage_photo_checks_limits_before_storing() {
        let store = MemoryBlobStore::new();
        let limits = IntakeLimits::default();
        let session_id = Uuid::new_v4();

        let oversized = Bytes::from(vec![0u8; 20 * 1024 * 1024]);
        let result = stage_photo(
            &store,
            &limits,
            session_id,
            "big.gif",
            "image/gif",
            PhotoKind::RawCard,
            oversized,
        )
        .await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));

        let result = stage_photo(
            &store,
            &limits,
            session_id,
            "..",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"jpeg"),
        )
        .await;
        assert!(matches!(
            result,
            Err(StorageError::Rejected(RejectReason::InvalidFilename(_)))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_stage_photo_normalizes_metadata() {
        let store = MemoryBlobStore::new();
        let photo = stage_photo(
            &store,
            &IntakeLimits::default(),
            Uuid::new_v4(),
            "1989 Topps...Griffey.JPG",
            "Image/JPEG; q=0.9",
            PhotoKind::RawCard,
            Bytes::from_static(b"jpeg"),
        )
        .await
        .unwrap();

        assert_eq!(photo.filename, "1989_Topps...Griffey.JPG");
        assert_eq!(photo.mime_type, "image/jpeg");
        assert!(photo.blob.is_some());
    }

    #[tokio::test]
    async fn test_stage_and_add_queues_photo() {
        let store = MemoryBlobStore::new();
        let mut orchestrator = intake_orchestrator(IntakeLimits::default());

        let id = stage_and_add(
            &mut orchestrator,
            &store,
            "front.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"front"),
        )
        .await
        .unwrap();

        assert_eq!(orchestrator.queue().position_of(id), Some(0));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_stage_and_add_releases_blob_when_queue_is_full() {
        let store = MemoryBlobStore::new();
        let limits = IntakeLimits {
            max_items: 1,
            ..IntakeLimits::default()
        };
        let mut orchestrator = intake_orchestrator(limits);
        orchestrator
            .add_item(cardlister_core::CertificateLookup::new("12345678"))
            .unwrap();

        let result = stage_and_add(
            &mut orchestrator,
            &store,
            "front.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"front"),
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::Rejected(RejectReason::QueueFull { max_items: 1 }))
        ));
        assert!(store.is_empty().await);
        assert_eq!(orchestrator.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_stage_and_add_outside_intake_stores_nothing() {
        let store = MemoryBlobStore::new();
        let mut orchestrator = StageOrchestrator::default();

        let result = stage_and_add(
            &mut orchestrator,
            &store,
            "front.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"front"),
        )
        .await;

        assert!(matches!(
            result,
            Err(StorageError::Intake(
                cardlister_core::IntakeError::PreconditionNotMet(_)
            ))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_and_release_deletes_cleared_photos() {
        let store = MemoryBlobStore::new();
        let mut orchestrator = intake_orchestrator(IntakeLimits::default());
        for name in ["front.jpg", "back.jpg"] {
            stage_and_add(
                &mut orchestrator,
                &store,
                name,
                "image/jpeg",
                PhotoKind::RawCard,
                Bytes::from_static(b"jpeg"),
            )
            .await
            .unwrap();
        }
        orchestrator
            .add_item(cardlister_core::CertificateLookup::new("12345678"))
            .unwrap();

        assert_eq!(reset_and_release(&mut orchestrator, &store).await.unwrap(), 2);
        assert_eq!(orchestrator.stage(), cardlister_core::Stage::LinkAccount);
        assert!(orchestrator.queue().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_release_removed_item() {
        let store = MemoryBlobStore::new();
        let mut orchestrator = intake_orchestrator(IntakeLimits::default());
        let id = stage_and_add(
            &mut orchestrator,
            &store,
            "front.jpg",
            "image/jpeg",
            PhotoKind::RawCard,
            Bytes::from_static(b"front"),
        )
        .await
        .unwrap();
        let lookup = orchestrator
            .add_item(cardlister_core::CertificateLookup::new("12345678"))
            .unwrap();

        let removed = orchestrator.remove_by_id(id).unwrap();
        assert!(release_item(&store, &removed).await.unwrap());
        let removed = orchestrator.remove_by_id(lookup).unwrap();
        assert!(!release_item(&store, &removed).await.unwrap());
        assert!(store.is_empty().await);
    }
}
