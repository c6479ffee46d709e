//! Listing session
//!
//! A session exclusively owns its connection state and upload queue. Sessions
//! share nothing, so independent tabs or users never interfere.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::config::IntakeLimits;
use crate::connection_state::ConnectionState;
use crate::error::{IntakeError, IntakeResult};
use crate::models::{ItemRecord, QueuedItem, SessionRecord, Stage};
use crate::queue::UploadQueue;

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    pub(crate) stage: Stage,
    pub(crate) connection: ConnectionState,
    pub(crate) queue: UploadQueue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(limits: IntakeLimits) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: Stage::LinkAccount,
            connection: ConnectionState::new(),
            queue: UploadQueue::new(limits),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Snapshot for resuming after a reload. Photo bytes are not included.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            session_id: self.id,
            stage: self.stage,
            connection_status: self.connection.status(),
            account_ref: self
                .connection
                .account_ref()
                .map(|account| account.as_str().to_string()),
            link_attempt: self.connection.pending_attempt().copied(),
            items: self.queue.iter().map(ItemRecord::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuild a session from a snapshot. The record must be internally
    /// consistent and every item must still satisfy `limits`.
    pub fn from_record(record: SessionRecord, limits: IntakeLimits) -> IntakeResult<Self> {
        record.validate()?;

        let connection = ConnectionState::restore(
            record.connection_status,
            record.account_ref,
            record.link_attempt,
        )?;

        let items = record
            .items
            .into_iter()
            .map(QueuedItem::try_from)
            .collect::<IntakeResult<Vec<_>>>()?;
        let queue = UploadQueue::restore(items, limits)?;

        if record.stage >= Stage::Review && !queue.is_ready_for_review() {
            return Err(IntakeError::InvalidRecord(format!(
                "stage {} requires a non-empty queue with no pending lookups",
                record.stage
            )));
        }

        if record.updated_at < record.created_at {
            return Err(IntakeError::InvalidRecord(
                "updated_at precedes created_at".to_string(),
            ));
        }

        Ok(Self {
            id: record.session_id,
            stage: record.stage,
            connection,
            queue,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(IntakeLimits::default())
    }
}
