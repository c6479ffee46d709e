use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::MAX_ACCOUNT_REF_LENGTH;

/// Marketplace account linkage status
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "connecting" => Ok(ConnectionStatus::Connecting),
            "connected" => Ok(ConnectionStatus::Connected),
            _ => Err(anyhow::anyhow!("Invalid connection status: {}", s)),
        }
    }
}

/// Opaque handle for a linked marketplace account, as returned by the provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRef(String);

impl AccountRef {
    /// Accepts any non-blank handle up to `MAX_ACCOUNT_REF_LENGTH` bytes.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() || value.len() > MAX_ACCOUNT_REF_LENGTH {
            return None;
        }
        Some(AccountRef(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// One outstanding linkage request. The provider echoes `attempt_id` back
/// (typically in the OAuth `state` parameter) so stale callbacks can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttempt {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl LinkAttempt {
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

impl Default for LinkAttempt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
    }

    #[test]
    fn test_connection_status_from_str() {
        assert_eq!(
            "connecting".parse::<ConnectionStatus>().unwrap(),
            ConnectionStatus::Connecting
        );
        assert!("linked".parse::<ConnectionStatus>().is_err());
    }

    #[test]
    fn test_account_ref_rejects_blank_and_oversized() {
        assert!(AccountRef::parse("acct-123").is_some());
        assert!(AccountRef::parse("").is_none());
        assert!(AccountRef::parse("   ").is_none());
        assert!(AccountRef::parse("a".repeat(MAX_ACCOUNT_REF_LENGTH + 1)).is_none());
    }

    #[test]
    fn test_link_attempts_are_distinct() {
        assert_ne!(LinkAttempt::new().attempt_id, LinkAttempt::new().attempt_id);
    }
}
