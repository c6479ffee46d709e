//! Persisted session snapshot
//!
//! A flat, serde-friendly view of a session used to resume after a reload.
//! Photo payloads never appear here; a staged photo is referenced by its `BlobRef`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{IntakeError, IntakeResult};
use crate::models::{
    BlobRef, CertificateLookup, ConnectionStatus, IntakeItem, ItemId, LinkAttempt, PhotoKind,
    QueuedItem, RawPhoto, Stage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRecordKind {
    RawPhoto,
    CertificateLookup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: ItemRecordKind,
    /// Filename for photos, certification number for lookups
    #[validate(length(min = 1, max = 255))]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 255))]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_kind: Option<PhotoKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<BlobRef>,
    /// Lookup confirmed, or photo recognized
    pub validated: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub stage: Stage,
    pub connection_status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 512))]
    pub account_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_attempt: Option<LinkAttempt>,
    #[validate(nested)]
    pub items: Vec<ItemRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn to_json(&self) -> IntakeResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> IntakeResult<Self> {
        let record: SessionRecord = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }
}

impl From<&QueuedItem> for ItemRecord {
    fn from(queued: &QueuedItem) -> Self {
        match &queued.item {
            IntakeItem::RawPhoto(photo) => ItemRecord {
                id: queued.id,
                kind: ItemRecordKind::RawPhoto,
                label: photo.filename.clone(),
                mime_type: Some(photo.mime_type.clone()),
                size_bytes: Some(photo.size_bytes),
                photo_kind: Some(photo.kind),
                blob: photo.blob.clone(),
                validated: photo.recognized,
                added_at: queued.added_at,
            },
            IntakeItem::CertificateLookup(lookup) => ItemRecord {
                id: queued.id,
                kind: ItemRecordKind::CertificateLookup,
                label: lookup.cert_number.clone(),
                mime_type: None,
                size_bytes: None,
                photo_kind: None,
                blob: None,
                validated: lookup.validated,
                added_at: queued.added_at,
            },
        }
    }
}

impl TryFrom<ItemRecord> for QueuedItem {
    type Error = IntakeError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let item = match record.kind {
            ItemRecordKind::RawPhoto => {
                let (mime_type, size_bytes) = match (record.mime_type, record.size_bytes) {
                    (Some(mime_type), Some(size_bytes)) => (mime_type, size_bytes),
                    _ => {
                        return Err(IntakeError::InvalidRecord(format!(
                            "photo item {} is missing its content type or size",
                            record.id
                        )))
                    }
                };
                let mut photo = RawPhoto::declared(record.label, mime_type, size_bytes)
                    .with_kind(record.photo_kind.unwrap_or_default());
                photo.blob = record.blob;
                photo.recognized = record.validated;
                IntakeItem::RawPhoto(photo)
            }
            ItemRecordKind::CertificateLookup => IntakeItem::CertificateLookup(CertificateLookup {
                cert_number: record.label,
                validated: record.validated,
            }),
        };

        Ok(QueuedItem {
            id: record.id,
            item,
            added_at: record.added_at,
        })
    }
}
