//! Configuration module
//!
//! Intake limits and storage selection, read from the environment (and `.env`
//! via dotenvy). Every value has a default, so an empty environment yields a
//! working configuration.

use std::env;

use crate::constants::{
    BYTES_PER_MIB, DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_CERT_NUMBER_MAX_DIGITS,
    DEFAULT_CERT_NUMBER_MIN_DIGITS, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_ITEMS,
};
use crate::storage_types::StorageBackend;

/// Upper bound on the certification digit range, well past any grading service's format
const CERT_NUMBER_DIGITS_CEILING: usize = 32;

/// Constraints the upload queue enforces on every item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeLimits {
    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub cert_number_min_digits: usize,
    pub cert_number_max_digits: usize,
    pub max_items: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * BYTES_PER_MIB,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cert_number_min_digits: DEFAULT_CERT_NUMBER_MIN_DIGITS,
            cert_number_max_digits: DEFAULT_CERT_NUMBER_MAX_DIGITS,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub cert_number_min_digits: usize,
    pub cert_number_max_digits: usize,
    pub max_items: usize,
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        let limits = IntakeLimits::default();
        Self {
            max_file_size_bytes: limits.max_file_size_bytes,
            allowed_content_types: limits.allowed_content_types,
            cert_number_min_digits: limits.cert_number_min_digits,
            cert_number_max_digits: limits.cert_number_max_digits,
            max_items: limits.max_items,
            storage_backend: StorageBackend::default(),
            local_storage_path: None,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    /// Unparseable numbers fall back to their defaults; an unknown backend is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_file_size_mb = lookup("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let allowed_content_types: Vec<String> = lookup("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| DEFAULT_ALLOWED_CONTENT_TYPES.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let cert_number_min_digits = lookup("CERT_NUMBER_MIN_DIGITS")
            .unwrap_or_else(|| DEFAULT_CERT_NUMBER_MIN_DIGITS.to_string())
            .parse()
            .unwrap_or(DEFAULT_CERT_NUMBER_MIN_DIGITS);

        let cert_number_max_digits = lookup("CERT_NUMBER_MAX_DIGITS")
            .unwrap_or_else(|| DEFAULT_CERT_NUMBER_MAX_DIGITS.to_string())
            .parse()
            .unwrap_or(DEFAULT_CERT_NUMBER_MAX_DIGITS);

        let max_items = lookup("INTAKE_MAX_ITEMS")
            .unwrap_or_else(|| DEFAULT_MAX_ITEMS.to_string())
            .parse()
            .unwrap_or(DEFAULT_MAX_ITEMS);

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::default(),
        };

        let local_storage_path = lookup("LOCAL_STORAGE_PATH").filter(|s| !s.trim().is_empty());

        Ok(Self {
            max_file_size_bytes: max_file_size_mb.saturating_mul(BYTES_PER_MIB),
            allowed_content_types,
            cert_number_min_digits,
            cert_number_max_digits,
            max_items,
            storage_backend,
            local_storage_path,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if let Some(bad) = self
            .allowed_content_types
            .iter()
            .find(|ct| !ct.contains('/'))
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_CONTENT_TYPES entry '{}' is not a MIME type",
                bad
            ));
        }

        if self.cert_number_min_digits == 0 {
            return Err(anyhow::anyhow!("CERT_NUMBER_MIN_DIGITS must be at least 1"));
        }

        if self.cert_number_min_digits > self.cert_number_max_digits {
            return Err(anyhow::anyhow!(
                "CERT_NUMBER_MIN_DIGITS ({}) cannot exceed CERT_NUMBER_MAX_DIGITS ({})",
                self.cert_number_min_digits,
                self.cert_number_max_digits
            ));
        }

        if self.cert_number_max_digits > CERT_NUMBER_DIGITS_CEILING {
            return Err(anyhow::anyhow!(
                "CERT_NUMBER_MAX_DIGITS cannot exceed {}",
                CERT_NUMBER_DIGITS_CEILING
            ));
        }

        if self.max_items == 0 {
            return Err(anyhow::anyhow!("INTAKE_MAX_ITEMS must be greater than 0"));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH to be set"
            ));
        }

        Ok(())
    }

    pub fn limits(&self) -> IntakeLimits {
        IntakeLimits {
            max_file_size_bytes: self.max_file_size_bytes,
            allowed_content_types: self.allowed_content_types.clone(),
            cert_number_min_digits: self.cert_number_min_digits,
            cert_number_max_digits: self.cert_number_max_digits,
            max_items: self.max_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<IntakeConfig, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IntakeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.allowed_content_types,
            vec!["image/jpeg", "image/png", "image/webp"]
        );
        assert_eq!(config.cert_number_min_digits, 6);
        assert_eq!(config.cert_number_max_digits, 9);
        assert_eq!(config.max_items, 50);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
        assert_eq!(config.limits(), IntakeLimits::default());
    }

    #[test]
    fn test_overrides_are_parsed_and_normalized() {
        let config = config_from(&[
            ("MAX_FILE_SIZE_MB", "25"),
            ("ALLOWED_CONTENT_TYPES", " Image/JPEG , image/heic ,"),
            ("INTAKE_MAX_ITEMS", "5"),
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/var/lib/cardlister"),
        ])
        .unwrap();
        assert_eq!(config.max_file_size_bytes, 25 * 1024 * 1024);
        assert_eq!(config.allowed_content_types, vec!["image/jpeg", "image/heic"]);
        assert_eq!(config.max_items, 5);
        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let config =
            config_from(&[("MAX_FILE_SIZE_MB", "ten"), ("INTAKE_MAX_ITEMS", "-1")]).unwrap();
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_items, 50);
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        assert!(config_from(&[("STORAGE_BACKEND", "s3")]).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_digit_range() {
        let config = config_from(&[
            ("CERT_NUMBER_MIN_DIGITS", "10"),
            ("CERT_NUMBER_MAX_DIGITS", "8"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_path_for_local_backend() {
        let config = config_from(&[("STORAGE_BACKEND", "local")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LOCAL_STORAGE_PATH"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = IntakeConfig::default();
        config.max_items = 0;
        assert!(config.validate().is_err());

        let mut config = IntakeConfig::default();
        config.allowed_content_types.clear();
        assert!(config.validate().is_err());
    }
}
