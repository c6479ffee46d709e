//! Hooks for the presentation layer
//!
//! The orchestrator reports stage changes, linkage requests and rejected items
//! through `IntakeObserver`, so a UI can mount the next collaborator (auth
//! redirect, upload form, review screen) without polling the session.
//! Callbacks run synchronously on the caller's thread and must not block.

use uuid::Uuid;

use crate::error::RejectReason;
use crate::models::{LinkAttempt, StageTransition};

pub trait IntakeObserver: Send + Sync {
    /// Called after every committed stage change, including `reset()`
    fn on_stage_changed(&self, transition: &StageTransition);

    /// Called when linkage starts; the receiver performs the provider redirect
    fn on_link_requested(&self, session_id: Uuid, attempt: &LinkAttempt);

    /// Called when the queue refuses an item
    fn on_item_rejected(&self, session_id: Uuid, reason: &RejectReason);
}

/// No-op implementation for headless use and tests
pub struct NoOpObserver;

impl IntakeObserver for NoOpObserver {
    fn on_stage_changed(&self, _transition: &StageTransition) {}

    fn on_link_requested(&self, _session_id: Uuid, _attempt: &LinkAttempt) {}

    fn on_item_rejected(&self, _session_id: Uuid, _reason: &RejectReason) {}
}
