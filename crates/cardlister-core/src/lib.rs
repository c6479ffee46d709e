//! Cardlister Core Library
//!
//! Session state for guided card listings: the stage orchestrator, the account
//! linkage state and the intake upload queue, plus the models, errors,
//! configuration and validation they share. All operations are synchronous;
//! slow I/O (reading photo bytes, lookups, provider redirects) happens in
//! collaborators that hand finished values back to the orchestrator.

pub mod config;
pub mod connection_state;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{IntakeConfig, IntakeLimits};
pub use connection_state::ConnectionState;
pub use error::{ErrorMetadata, IntakeError, IntakeResult, LogLevel, RejectReason};
pub use hooks::{IntakeObserver, NoOpObserver};
pub use models::{
    AccountRef, BlobRef, CertificateLookup, ConnectionStatus, IntakeItem, ItemId, ItemRecord,
    LinkAttempt, PhotoKind, QueuedItem, RawPhoto, SessionRecord, Stage, StageTransition,
    StepProgress,
};
pub use orchestrator::{StageOrchestrator, Transition};
pub use queue::UploadQueue;
pub use session::Session;
pub use storage_types::StorageBackend;
