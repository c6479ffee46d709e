//! Marketplace account linkage state
//!
//! Linkage is redirect-and-return: `begin_link` marks the session as
//! `Connecting` and hands back a `LinkAttempt`; the provider later reports the
//! outcome through `complete_link` or `fail_link`. Callbacks that arrive in any
//! other state are refused with `InvalidCallback` and leave the state untouched.

use uuid::Uuid;

use crate::error::{IntakeError, IntakeResult};
use crate::models::{AccountRef, ConnectionStatus, LinkAttempt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    status: ConnectionStatus,
    account_ref: Option<AccountRef>,
    pending: Option<LinkAttempt>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Present only while `Connected`
    pub fn account_ref(&self) -> Option<&AccountRef> {
        self.account_ref.as_ref()
    }

    /// Present only while `Connecting`
    pub fn pending_attempt(&self) -> Option<&LinkAttempt> {
        self.pending.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Start a linkage attempt. At most one attempt is outstanding per session.
    pub fn begin_link(&mut self) -> IntakeResult<LinkAttempt> {
        match self.status {
            ConnectionStatus::Disconnected => {}
            ConnectionStatus::Connecting => {
                return Err(IntakeError::PreconditionNotMet(
                    "account linkage already in progress".to_string(),
                ))
            }
            ConnectionStatus::Connected => {
                return Err(IntakeError::PreconditionNotMet(
                    "account already linked".to_string(),
                ))
            }
        }

        let attempt = LinkAttempt::new();
        self.status = ConnectionStatus::Connecting;
        self.pending = Some(attempt);
        tracing::debug!(attempt_id = %attempt.attempt_id, "Account linkage started");
        Ok(attempt)
    }

    /// Record a successful provider callback.
    pub fn complete_link(&mut self, account_ref: impl Into<String>) -> IntakeResult<()> {
        if self.status != ConnectionStatus::Connecting {
            return Err(self.discard_callback(format!(
                "link completion received while {}",
                self.status
            )));
        }

        let account_ref = AccountRef::parse(account_ref).ok_or_else(|| {
            self.discard_callback("provider returned an empty or oversized account reference")
        })?;

        tracing::info!(
            attempt_id = ?self.pending.map(|a| a.attempt_id),
            "Marketplace account linked"
        );
        self.status = ConnectionStatus::Connected;
        self.account_ref = Some(account_ref);
        self.pending = None;
        Ok(())
    }

    /// Like `complete_link`, but also refuses callbacks for a superseded attempt.
    pub fn complete_link_attempt(
        &mut self,
        attempt_id: Uuid,
        account_ref: impl Into<String>,
    ) -> IntakeResult<()> {
        self.check_attempt(attempt_id)?;
        self.complete_link(account_ref)
    }

    /// Resolve a failed linkage back to `Disconnected`. Repeated calls are no-ops.
    /// A failure reported after the account is linked is a stale callback.
    pub fn fail_link(&mut self) -> IntakeResult<()> {
        match self.status {
            ConnectionStatus::Disconnected => Ok(()),
            ConnectionStatus::Connecting => {
                tracing::info!(
                    attempt_id = ?self.pending.map(|a| a.attempt_id),
                    "Account linkage failed"
                );
                self.status = ConnectionStatus::Disconnected;
                self.pending = None;
                Ok(())
            }
            ConnectionStatus::Connected => Err(self.discard_callback(
                "link failure received for an already linked account",
            )),
        }
    }

    pub fn fail_link_attempt(&mut self, attempt_id: Uuid) -> IntakeResult<()> {
        if self.status == ConnectionStatus::Connecting {
            self.check_attempt(attempt_id)?;
        }
        self.fail_link()
    }

    /// Explicit sign-out, owned by the account collaborator.
    pub fn disconnect(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            tracing::info!(from = %self.status, "Marketplace account disconnected");
        }
        *self = Self::default();
    }

    /// Rebuild a state from persisted parts, checking they agree with each other.
    pub(crate) fn restore(
        status: ConnectionStatus,
        account_ref: Option<String>,
        pending: Option<LinkAttempt>,
    ) -> IntakeResult<Self> {
        let account_ref = match account_ref {
            Some(value) => Some(AccountRef::parse(value).ok_or_else(|| {
                IntakeError::InvalidRecord("account reference is blank".to_string())
            })?),
            None => None,
        };

        match (status, &account_ref, &pending) {
            (ConnectionStatus::Disconnected, None, None)
            | (ConnectionStatus::Connecting, None, Some(_))
            | (ConnectionStatus::Connected, Some(_), None) => Ok(Self {
                status,
                account_ref,
                pending,
            }),
            _ => Err(IntakeError::InvalidRecord(format!(
                "connection status {} does not match stored account reference or pending attempt",
                status
            ))),
        }
    }

    fn check_attempt(&self, attempt_id: Uuid) -> IntakeResult<()> {
        match self.pending {
            Some(pending) if pending.attempt_id == attempt_id => Ok(()),
            Some(_) => Err(self.discard_callback(format!(
                "callback for superseded link attempt {}",
                attempt_id
            ))),
            None => Err(self.discard_callback(format!(
                "callback for link attempt {} while {}",
                attempt_id, self.status
            ))),
        }
    }

    fn discard_callback(&self, reason: impl Into<String>) -> IntakeError {
        let reason = reason.into();
        tracing::warn!(status = %self.status, reason = %reason, "Discarding linkage callback");
        IntakeError::InvalidCallback(reason)
    }
}
