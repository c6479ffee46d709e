use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Stable identifier assigned to an item when the queue accepts it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        ItemId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        ItemId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a photo payload held by a blob store.
/// The core never interprets it; persisted sessions carry this instead of bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(key: impl Into<String>) -> Self {
        BlobRef(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlobRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// What the photo shows: an ungraded card, or a graded slab whose label
/// carries a certification number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    #[default]
    RawCard,
    GradedSlab,
}

/// Uploaded photograph of a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPhoto {
    /// Original filename as supplied by the browser or device
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub kind: PhotoKind,
    /// Handle of the staged payload, once a blob store holds it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<BlobRef>,
    /// Set when the recognition service has identified the card
    #[serde(default)]
    pub recognized: bool,
    /// Payload bytes; empty for photos restored from a session record
    #[serde(skip)]
    pub data: Bytes,
}

impl RawPhoto {
    /// Photo with its payload in hand; the size is taken from the payload.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            size_bytes: data.len() as u64,
            kind: PhotoKind::RawCard,
            blob: None,
            recognized: false,
            data,
        }
    }

    /// Photo described by metadata only, e.g. when the payload is still streaming.
    pub fn declared(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            size_bytes,
            kind: PhotoKind::RawCard,
            blob: None,
            recognized: false,
            data: Bytes::new(),
        }
    }

    pub fn with_kind(mut self, kind: PhotoKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_blob(mut self, blob: BlobRef) -> Self {
        self.blob = Some(blob);
        self
    }

    /// Size in MiB with one decimal, as shown next to thumbnails
    pub fn size_mib(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 10.0).round() / 10.0
    }
}

/// Certification number to be resolved by the external grading database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateLookup {
    pub cert_number: String,
    #[serde(default)]
    pub validated: bool,
}

impl CertificateLookup {
    pub fn new(cert_number: impl Into<String>) -> Self {
        Self {
            cert_number: cert_number.into(),
            validated: false,
        }
    }
}

/// One raw input contributed toward a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeItem {
    RawPhoto(RawPhoto),
    CertificateLookup(CertificateLookup),
}

impl IntakeItem {
    pub fn type_name(&self) -> &'static str {
        match self {
            IntakeItem::RawPhoto(_) => "raw_photo",
            IntakeItem::CertificateLookup(_) => "certificate_lookup",
        }
    }

    /// Filename or certification number, for display and logs
    pub fn label(&self) -> &str {
        match self {
            IntakeItem::RawPhoto(photo) => &photo.filename,
            IntakeItem::CertificateLookup(lookup) => &lookup.cert_number,
        }
    }

    /// True for a certificate lookup the external service has not confirmed yet
    pub fn is_pending_lookup(&self) -> bool {
        matches!(self, IntakeItem::CertificateLookup(lookup) if !lookup.validated)
    }
}

impl From<RawPhoto> for IntakeItem {
    fn from(photo: RawPhoto) -> Self {
        IntakeItem::RawPhoto(photo)
    }
}

impl From<CertificateLookup> for IntakeItem {
    fn from(lookup: CertificateLookup) -> Self {
        IntakeItem::CertificateLookup(lookup)
    }
}

/// An accepted item with its queue identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub id: ItemId,
    pub item: IntakeItem,
    pub added_at: DateTime<Utc>,
}
