//! Validation modules

pub mod intake;

pub use intake::{
    normalize_mime_type, sanitize_filename, validate_cert_number, validate_content_type,
    validate_file_size, validate_item, validate_photo,
};
