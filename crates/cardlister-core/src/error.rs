//! Error types module
//!
//! Every core operation returns `IntakeResult<T>`. Failures never leave the
//! session in a partially mutated state: the worst outcome of any error is that
//! the session stays in its current stage with its queue unchanged.
//!
//! `ErrorMetadata` lets the presentation layer decide how to surface an error
//! (verbatim to the user, as an integration bug, or silently logged) without
//! matching on every variant itself.

use crate::models::{ItemId, Stage};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like rejected uploads
    Debug,
    /// Warning level - for discarded callbacks and caller mistakes
    Warn,
    /// Error level - for corrupted persisted state
    Error,
}

/// Metadata describing how an error should be presented
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "PRECONDITION_NOT_MET")
    fn error_code(&self) -> &'static str;

    /// Whether the user can fix the problem and try again
    fn is_recoverable(&self) -> bool;

    /// Whether the message is meant for the end user rather than the integrator
    fn is_user_facing(&self) -> bool;

    /// Suggested action for the user or integrator
    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show in the UI
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Why an intake item was refused by the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("file is {size_bytes} bytes, which exceeds the {max_bytes} byte limit")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("content type '{mime_type}' is not accepted (allowed: {})", .allowed.join(", "))]
    UnsupportedType {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("file is empty")]
    EmptyFile,

    #[error("declared size {declared} bytes does not match {actual} bytes received")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("certification number '{cert_number}' must be {min_digits}-{max_digits} digits")]
    InvalidCertNumber {
        cert_number: String,
        min_digits: usize,
        max_digits: usize,
    },

    #[error("queue already holds the maximum of {max_items} items")]
    QueueFull { max_items: usize },

    #[error("invalid filename: {0}")]
    InvalidFilename(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("Item rejected: {0}")]
    ItemRejected(RejectReason),

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Index {index} out of range for queue of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Transition out of order: session is in {current}, request expects {requested}")]
    OutOfOrder { current: Stage, requested: Stage },

    #[error("Invalid session record: {0}")]
    InvalidRecord(String),
}

/// Result type for core operations
pub type IntakeResult<T> = Result<T, IntakeError>;

impl From<RejectReason> for IntakeError {
    fn from(reason: RejectReason) -> Self {
        IntakeError::ItemRejected(reason)
    }
}

impl From<validator::ValidationErrors> for IntakeError {
    fn from(err: validator::ValidationErrors) -> Self {
        IntakeError::InvalidRecord(format!("Validation error: {}", err))
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::InvalidRecord(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant:
/// (error_code, recoverable, user_facing, suggested_action, log_level).
fn intake_error_static_metadata(
    err: &IntakeError,
) -> (&'static str, bool, bool, Option<&'static str>, LogLevel) {
    match err {
        IntakeError::PreconditionNotMet(_) => (
            "PRECONDITION_NOT_MET",
            true,
            true,
            Some("Complete the current step before continuing"),
            LogLevel::Debug,
        ),
        IntakeError::ItemRejected(_) => (
            "ITEM_REJECTED",
            true,
            true,
            Some("Fix the item and submit it again"),
            LogLevel::Debug,
        ),
        IntakeError::InvalidCallback(_) => (
            "INVALID_CALLBACK",
            false,
            false,
            None,
            LogLevel::Warn,
        ),
        IntakeError::IndexOutOfRange { .. } => (
            "INDEX_OUT_OF_RANGE",
            false,
            false,
            Some("Refresh the queue view before addressing items by index"),
            LogLevel::Warn,
        ),
        IntakeError::ItemNotFound(_) => (
            "ITEM_NOT_FOUND",
            false,
            false,
            Some("Verify the item ID belongs to this session"),
            LogLevel::Warn,
        ),
        IntakeError::OutOfOrder { .. } => (
            "OUT_OF_ORDER",
            false,
            false,
            Some("Re-read the current stage before requesting a transition"),
            LogLevel::Warn,
        ),
        IntakeError::InvalidRecord(_) => (
            "INVALID_RECORD",
            false,
            false,
            Some("Discard the saved session and start a new one"),
            LogLevel::Error,
        ),
    }
}

impl IntakeError {
    /// Get the error type name for structured logs
    pub fn error_type(&self) -> &'static str {
        match self {
            IntakeError::PreconditionNotMet(_) => "PreconditionNotMet",
            IntakeError::ItemRejected(_) => "ItemRejected",
            IntakeError::InvalidCallback(_) => "InvalidCallback",
            IntakeError::IndexOutOfRange { .. } => "IndexOutOfRange",
            IntakeError::ItemNotFound(_) => "ItemNotFound",
            IntakeError::OutOfOrder { .. } => "OutOfOrder",
            IntakeError::InvalidRecord(_) => "InvalidRecord",
        }
    }

    /// Emit a tracing event at this error's log level
    pub fn log(&self) {
        let error_type = self.error_type();
        match self.log_level() {
            LogLevel::Debug => {
                tracing::debug!(error = %self, error_type = error_type, "Intake operation refused");
            }
            LogLevel::Warn => {
                tracing::warn!(error = %self, error_type = error_type, "Intake operation refused");
            }
            LogLevel::Error => {
                tracing::error!(error = %self, error_type = error_type, "Intake operation refused");
            }
        }
    }
}

impl ErrorMetadata for IntakeError {
    fn error_code(&self) -> &'static str {
        intake_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        intake_error_static_metadata(self).1
    }

    fn is_user_facing(&self) -> bool {
        intake_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        intake_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        intake_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            IntakeError::PreconditionNotMet(ref reason) => reason.clone(),
            IntakeError::ItemRejected(ref reason) => reason.to_string(),
            IntakeError::InvalidCallback(_) => "Something went wrong, please try again".to_string(),
            IntakeError::IndexOutOfRange { .. } | IntakeError::ItemNotFound(_) => {
                "That item is no longer in your upload list".to_string()
            }
            IntakeError::OutOfOrder { current, .. } => {
                format!("This listing is already at the '{}' step", current.title())
            }
            IntakeError::InvalidRecord(_) => {
                "Your saved session could not be restored".to_string()
            }
        }
    }
}
