//! Cardlister Storage Library
//!
//! Async collaborators around the synchronous core: a blob store for photo
//! payloads and a session store for resumable snapshots, each with in-memory
//! and local filesystem implementations.
//!
//! # Storage key format
//!
//! - **Photo blobs**: `intake/{session_id}/{uuid}.{ext}`
//! - **Session snapshots**: `sessions/{session_id}.json`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use cardlister_core::StorageBackend;
pub use factory::{create_blob_store, create_session_store};
#[cfg(feature = "storage-local")]
pub use local::{LocalBlobStore, LocalSessionStore};
pub use memory::{MemoryBlobStore, MemorySessionStore};
pub use staging::{
    purge_session, release_item, reset_and_release, stage_and_add, stage_photo,
    stage_photo_from_reader,
};
pub use traits::{BlobStore, SessionStore, StorageError, StorageResult};
