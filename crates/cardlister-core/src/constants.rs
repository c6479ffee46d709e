//! Intake defaults shared by configuration and validation.

/// Default per-file upload limit in MiB.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Default image formats accepted for photo intake.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Shortest certification number accepted for lookup.
pub const DEFAULT_CERT_NUMBER_MIN_DIGITS: usize = 6;

/// Longest certification number accepted for lookup.
pub const DEFAULT_CERT_NUMBER_MAX_DIGITS: usize = 9;

/// Maximum number of items a single session may queue.
pub const DEFAULT_MAX_ITEMS: usize = 50;

/// Longest filename kept for a photo after sanitization.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Longest external account handle accepted from the linkage provider.
pub const MAX_ACCOUNT_REF_LENGTH: usize = 512;

pub(crate) const BYTES_PER_MIB: u64 = 1024 * 1024;
