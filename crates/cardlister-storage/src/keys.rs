//! Shared key generation for storage backends.
//!
//! Blob keys: `intake/{session_id}/{uuid}.{ext}`. Session snapshots: `sessions/{session_id}.json`.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const BLOB_PREFIX: &str = "intake";
const SESSION_PREFIX: &str = "sessions";
const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LENGTH: usize = 8;

/// Generate a blob key for a photo staged in `session_id`.
///
/// Only the extension of the original filename is kept; the rest of the key is
/// generated, so user-supplied names never reach the filesystem.
pub fn generate_blob_key(session_id: Uuid, filename: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        BLOB_PREFIX,
        session_id,
        Uuid::new_v4(),
        extension_of(filename)
    )
}

/// Prefix shared by every blob of a session, with trailing slash
pub fn session_blob_prefix(session_id: Uuid) -> String {
    format!("{}/{}/", BLOB_PREFIX, session_id)
}

pub fn session_record_key(session_id: Uuid) -> String {
    format!("{}/{}.json", SESSION_PREFIX, session_id)
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.contains("..")
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}
