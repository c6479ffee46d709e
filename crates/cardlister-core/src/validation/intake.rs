//! Intake item validation
//!
//! Photos are checked for size, content type, and filename; certificate lookups
//! for their digit pattern. Each check returns a `RejectReason` so the queue can
//! refuse the item without touching its contents.

use regex::Regex;

use crate::config::IntakeLimits;
use crate::constants::MAX_FILENAME_LENGTH;
use crate::error::RejectReason;
use crate::models::{CertificateLookup, IntakeItem, RawPhoto};

/// Fallback name for photos whose filename sanitizes to nothing
const FALLBACK_FILENAME: &str = "photo";

pub fn validate_file_size(size_bytes: u64, max_bytes: u64) -> Result<(), RejectReason> {
    if size_bytes == 0 {
        return Err(RejectReason::EmptyFile);
    }
    if size_bytes > max_bytes {
        return Err(RejectReason::TooLarge {
            size_bytes,
            max_bytes,
        });
    }
    Ok(())
}

/// Strip MIME parameters (e.g. "image/jpeg; q=0.9" -> "image/jpeg") and lowercase.
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Compare the normalized type against the allowlist; returns the normalized type.
pub fn validate_content_type(
    content_type: &str,
    allowed_types: &[String],
) -> Result<String, RejectReason> {
    let normalized = normalize_mime_type(content_type);
    if !allowed_types
        .iter()
        .any(|ct| ct.eq_ignore_ascii_case(&normalized))
    {
        return Err(RejectReason::UnsupportedType {
            mime_type: normalized,
            allowed: allowed_types.to_vec(),
        });
    }
    Ok(normalized)
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]` with an underscore. Dots inside a name are kept; only a
/// bare `.` or `..` component is refused.
pub fn sanitize_filename(filename: &str) -> Result<String, RejectReason> {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    if filename_only == "." || filename_only == ".." {
        return Err(RejectReason::InvalidFilename(
            "filename is a directory reference".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return Ok(FALLBACK_FILENAME.to_string());
    }

    Ok(sanitized)
}

/// Trim surrounding whitespace and require `min..=max` ASCII digits.
pub fn validate_cert_number(
    cert_number: &str,
    min_digits: usize,
    max_digits: usize,
) -> Result<String, RejectReason> {
    let trimmed = cert_number.trim();
    let invalid = || RejectReason::InvalidCertNumber {
        cert_number: trimmed.to_string(),
        min_digits,
        max_digits,
    };

    let pattern = Regex::new(&format!(r"^[0-9]{{{},{}}}$", min_digits, max_digits))
        .map_err(|_| invalid())?;

    if !pattern.is_match(trimmed) {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

/// Check a photo against the limits and return it with a sanitized filename
/// and normalized content type.
pub fn validate_photo(photo: RawPhoto, limits: &IntakeLimits) -> Result<RawPhoto, RejectReason> {
    if !photo.data.is_empty() && photo.data.len() as u64 != photo.size_bytes {
        return Err(RejectReason::SizeMismatch {
            declared: photo.size_bytes,
            actual: photo.data.len() as u64,
        });
    }
    validate_file_size(photo.size_bytes, limits.max_file_size_bytes)?;
    let mime_type = validate_content_type(&photo.mime_type, &limits.allowed_content_types)?;
    let filename = sanitize_filename(&photo.filename)?;

    Ok(RawPhoto {
        filename,
        mime_type,
        ..photo
    })
}

fn validate_lookup(
    lookup: CertificateLookup,
    limits: &IntakeLimits,
) -> Result<CertificateLookup, RejectReason> {
    let cert_number = validate_cert_number(
        &lookup.cert_number,
        limits.cert_number_min_digits,
        limits.cert_number_max_digits,
    )?;
    Ok(CertificateLookup {
        cert_number,
        ..lookup
    })
}

/// Check an item against the limits and return its normalized form.
pub fn validate_item(item: IntakeItem, limits: &IntakeLimits) -> Result<IntakeItem, RejectReason> {
    match item {
        IntakeItem::RawPhoto(photo) => validate_photo(photo, limits).map(IntakeItem::RawPhoto),
        IntakeItem::CertificateLookup(lookup) => {
            validate_lookup(lookup, limits).map(IntakeItem::CertificateLookup)
        }
    }
}
