//! Stage orchestrator
//!
//! Finite state machine over LINK_ACCOUNT → INTAKE → REVIEW → PUBLISH.
//! Every transition is an explicit call that either returns the new stage or a
//! typed error; nothing advances on its own. A request whose target is the
//! current stage is a no-op, so a reloaded page can safely re-issue it.
//!
//! Queue mutations are routed through the orchestrator and are only accepted
//! while the session is in INTAKE.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::IntakeLimits;
use crate::connection_state::ConnectionState;
use crate::error::{IntakeError, IntakeResult};
use crate::hooks::{IntakeObserver, NoOpObserver};
use crate::models::{
    IntakeItem, ItemId, LinkAttempt, QueuedItem, SessionRecord, Stage, StageTransition,
};
use crate::queue::UploadQueue;
use crate::session::Session;

/// A forward stage change a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// LINK_ACCOUNT → INTAKE, guarded by a linked account
    StartIntake,
    /// INTAKE → REVIEW, guarded by a ready queue
    SubmitForReview,
    /// REVIEW → PUBLISH, guarded by the review collaborator's approval and a
    /// still-linked account
    Publish { approved: bool },
}

impl Transition {
    pub fn from_stage(self) -> Stage {
        match self {
            Transition::StartIntake => Stage::LinkAccount,
            Transition::SubmitForReview => Stage::Intake,
            Transition::Publish { .. } => Stage::Review,
        }
    }

    pub fn to_stage(self) -> Stage {
        match self {
            Transition::StartIntake => Stage::Intake,
            Transition::SubmitForReview => Stage::Review,
            Transition::Publish { .. } => Stage::Publish,
        }
    }
}

pub struct StageOrchestrator {
    session: Session,
    observer: Arc<dyn IntakeObserver>,
}

impl StageOrchestrator {
    pub fn new(limits: IntakeLimits) -> Self {
        Self::from_session(Session::new(limits))
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            session,
            observer: Arc::new(NoOpObserver),
        }
    }

    /// Resume a persisted session
    pub fn from_record(record: SessionRecord, limits: IntakeLimits) -> IntakeResult<Self> {
        let session = Session::from_record(record, limits).map_err(logged)?;
        tracing::info!(
            session_id = %session.id(),
            stage = %session.stage(),
            items = session.queue().len(),
            "Session resumed"
        );
        Ok(Self::from_session(session))
    }

    pub fn with_observer(mut self, observer: Arc<dyn IntakeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    pub fn stage(&self) -> Stage {
        self.session.stage()
    }

    pub fn connection(&self) -> &ConnectionState {
        self.session.connection()
    }

    pub fn queue(&self) -> &UploadQueue {
        self.session.queue()
    }

    pub fn to_record(&self) -> SessionRecord {
        self.session.to_record()
    }

    // Account linkage

    /// Start linkage; the observer receives the attempt and performs the redirect.
    pub fn begin_link(&mut self) -> IntakeResult<LinkAttempt> {
        let attempt = self.session.connection.begin_link().map_err(logged)?;
        self.session.touch();
        self.observer.on_link_requested(self.session.id(), &attempt);
        Ok(attempt)
    }

    pub fn complete_link(&mut self, account_ref: impl Into<String>) -> IntakeResult<()> {
        self.session.connection.complete_link(account_ref)?;
        self.session.touch();
        Ok(())
    }

    pub fn complete_link_attempt(
        &mut self,
        attempt_id: Uuid,
        account_ref: impl Into<String>,
    ) -> IntakeResult<()> {
        self.session
            .connection
            .complete_link_attempt(attempt_id, account_ref)?;
        self.session.touch();
        Ok(())
    }

    pub fn fail_link(&mut self) -> IntakeResult<()> {
        self.session.connection.fail_link()?;
        self.session.touch();
        Ok(())
    }

    pub fn fail_link_attempt(&mut self, attempt_id: Uuid) -> IntakeResult<()> {
        self.session.connection.fail_link_attempt(attempt_id)?;
        self.session.touch();
        Ok(())
    }

    /// Explicit sign-out. The stage is left alone; the next guard that needs
    /// a linked account will refuse.
    pub fn disconnect(&mut self) {
        self.session.connection.disconnect();
        self.session.touch();
    }

    // Transitions

    pub fn start_intake(&mut self) -> IntakeResult<Stage> {
        self.request(Transition::StartIntake)
    }

    pub fn submit_for_review(&mut self) -> IntakeResult<Stage> {
        self.request(Transition::SubmitForReview)
    }

    pub fn publish(&mut self, approved: bool) -> IntakeResult<Stage> {
        self.request(Transition::Publish { approved })
    }

    pub fn request(&mut self, transition: Transition) -> IntakeResult<Stage> {
        let current = self.session.stage;
        let target = transition.to_stage();

        if current == target {
            tracing::debug!(
                session_id = %self.session.id(),
                stage = %current,
                "Transition already applied"
            );
            return Ok(current);
        }

        if current != transition.from_stage() {
            return Err(logged(IntakeError::OutOfOrder {
                current,
                requested: target,
            }));
        }

        self.check_guard(transition).map_err(logged)?;
        self.move_to(target);
        Ok(target)
    }

    /// Return to LINK_ACCOUNT from any stage. The queue is cleared; the
    /// account linkage is kept for the next listing.
    pub fn reset(&mut self) -> Stage {
        let cleared = self.session.queue.len();
        self.session.queue.clear();
        tracing::debug!(
            session_id = %self.session.id(),
            cleared_items = cleared,
            "Upload queue cleared"
        );
        if self.session.stage == Stage::LinkAccount {
            self.session.touch();
        } else {
            self.move_to(Stage::LinkAccount);
        }
        Stage::LinkAccount
    }

    // Queue

    pub fn add_item(&mut self, item: impl Into<IntakeItem>) -> IntakeResult<ItemId> {
        self.require_intake("add items")?;
        match self.session.queue.add_item(item) {
            Ok(id) => {
                self.session.touch();
                Ok(id)
            }
            Err(err) => {
                if let IntakeError::ItemRejected(reason) = &err {
                    self.observer.on_item_rejected(self.session.id(), reason);
                }
                Err(logged(err))
            }
        }
    }

    pub fn remove_item(&mut self, index: usize) -> IntakeResult<QueuedItem> {
        self.require_intake("remove items")?;
        let removed = self.session.queue.remove_item(index).map_err(logged)?;
        self.session.touch();
        Ok(removed)
    }

    pub fn remove_by_id(&mut self, id: ItemId) -> IntakeResult<QueuedItem> {
        self.require_intake("remove items")?;
        let removed = self.session.queue.remove_by_id(id).map_err(logged)?;
        self.session.touch();
        Ok(removed)
    }

    /// Outcome from the lookup or recognition collaborator. A result that
    /// arrives after the session left INTAKE is discarded.
    pub fn mark_validated(&mut self, index: usize) -> IntakeResult<()> {
        self.require_intake_for_callback()?;
        self.session.queue.mark_validated(index).map_err(logged)?;
        self.session.touch();
        Ok(())
    }

    pub fn mark_validated_by_id(&mut self, id: ItemId) -> IntakeResult<()> {
        self.require_intake_for_callback()?;
        self.session.queue.mark_validated_by_id(id).map_err(logged)?;
        self.session.touch();
        Ok(())
    }

    fn check_guard(&self, transition: Transition) -> IntakeResult<()> {
        match transition {
            Transition::StartIntake if !self.session.connection.is_connected() => Err(
                IntakeError::PreconditionNotMet("account not linked".to_string()),
            ),
            Transition::SubmitForReview if !self.session.queue.is_ready_for_review() => {
                let reason = if self.session.queue.is_empty() {
                    "no items submitted".to_string()
                } else {
                    format!(
                        "{} certification lookup(s) awaiting confirmation",
                        self.session.queue.pending_lookups().count()
                    )
                };
                Err(IntakeError::PreconditionNotMet(reason))
            }
            Transition::Publish { approved: false } => Err(IntakeError::PreconditionNotMet(
                "listing not approved".to_string(),
            )),
            Transition::Publish { .. } if !self.session.connection.is_connected() => Err(
                IntakeError::PreconditionNotMet("account not linked".to_string()),
            ),
            _ => Ok(()),
        }
    }

    fn move_to(&mut self, to: Stage) {
        let transition = StageTransition {
            session_id: self.session.id(),
            from: self.session.stage,
            to,
            transitioned_at: Utc::now(),
        };
        self.session.stage = to;
        self.session.touch();
        tracing::info!(
            session_id = %transition.session_id,
            from = %transition.from,
            to = %transition.to,
            "Stage changed"
        );
        self.observer.on_stage_changed(&transition);
    }

    fn require_intake(&self, action: &str) -> IntakeResult<()> {
        if self.session.stage != Stage::Intake {
            return Err(logged(IntakeError::PreconditionNotMet(format!(
                "cannot {} during the '{}' step",
                action,
                self.session.stage.title()
            ))));
        }
        Ok(())
    }

    fn require_intake_for_callback(&self) -> IntakeResult<()> {
        if self.session.stage != Stage::Intake {
            return Err(logged(IntakeError::InvalidCallback(format!(
                "validation result received during {}",
                self.session.stage
            ))));
        }
        Ok(())
    }
}

impl Default for StageOrchestrator {
    fn default() -> Self {
        Self::new(IntakeLimits::default())
    }
}

fn logged(err: IntakeError) -> IntakeError {
    err.log();
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificateLookup, RawPhoto};

    fn linked() -> StageOrchestrator {
        let mut orchestrator = StageOrchestrator::default();
        orchestrator.begin_link().unwrap();
        orchestrator.complete_link("acct-123").unwrap();
        orchestrator
    }

    fn photo() -> RawPhoto {
        RawPhoto::new("front.jpg", "image/jpeg", vec![0u8; 512])
    }

    #[test]
    fn test_transition_endpoints() {
        assert_eq!(Transition::StartIntake.from_stage(), Stage::LinkAccount);
        assert_eq!(Transition::SubmitForReview.to_stage(), Stage::Review);
        assert_eq!(
            Transition::Publish { approved: true }.from_stage(),
            Stage::Review
        );
    }

    #[test]
    fn test_start_intake_requires_linked_account() {
        let mut orchestrator = StageOrchestrator::default();
        assert_eq!(
            orchestrator.start_intake(),
            Err(IntakeError::PreconditionNotMet("account not linked".to_string()))
        );

        orchestrator.begin_link().unwrap();
        assert!(orchestrator.start_intake().is_err());
        assert_eq!(orchestrator.stage(), Stage::LinkAccount);
    }

    #[test]
    fn test_submit_for_review_requires_items() {
        let mut orchestrator = linked();
        orchestrator.start_intake().unwrap();
        assert_eq!(
            orchestrator.submit_for_review(),
            Err(IntakeError::PreconditionNotMet("no items submitted".to_string()))
        );
        assert_eq!(orchestrator.stage(), Stage::Intake);
    }

    #[test]
    fn test_pending_lookup_reason_is_specific() {
        let mut orchestrator = linked();
        orchestrator.start_intake().unwrap();
        orchestrator
            .add_item(CertificateLookup::new("12345678"))
            .unwrap();
        match orchestrator.submit_for_review() {
            Err(IntakeError::PreconditionNotMet(reason)) => {
                assert!(reason.contains("awaiting confirmation"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_publish_requires_approval() {
        let mut orchestrator = linked();
        orchestrator.start_intake().unwrap();
        orchestrator.add_item(photo()).unwrap();
        orchestrator.submit_for_review().unwrap();

        assert_eq!(
            orchestrator.publish(false),
            Err(IntakeError::PreconditionNotMet(
                "listing not approved".to_string()
            ))
        );
        assert_eq!(orchestrator.publish(true), Ok(Stage::Publish));
        assert_eq!(orchestrator.queue().len(), 1);
    }

    #[test]
    fn test_same_target_is_a_no_op() {
        let mut orchestrator = linked();
        assert_eq!(orchestrator.start_intake(), Ok(Stage::Intake));
        let updated_at = orchestrator.session().updated_at();
        assert_eq!(orchestrator.start_intake(), Ok(Stage::Intake));
        assert_eq!(orchestrator.session().updated_at(), updated_at);
    }

    #[test]
    fn test_skipping_or_going_back_is_out_of_order() {
        let mut orchestrator = linked();
        assert_eq!(
            orchestrator.submit_for_review(),
            Err(IntakeError::OutOfOrder {
                current: Stage::LinkAccount,
                requested: Stage::Review
            })
        );

        orchestrator.start_intake().unwrap();
        orchestrator.add_item(photo()).unwrap();
        orchestrator.submit_for_review().unwrap();
        assert_eq!(
            orchestrator.start_intake(),
            Err(IntakeError::OutOfOrder {
                current: Stage::Review,
                requested: Stage::Intake
            })
        );
        assert_eq!(orchestrator.stage(), Stage::Review);
    }

    #[test]
    fn test_queue_is_closed_outside_intake() {
        let mut orchestrator = linked();
        assert!(matches!(
            orchestrator.add_item(photo()),
            Err(IntakeError::PreconditionNotMet(_))
        ));

        orchestrator.start_intake().unwrap();
        orchestrator.add_item(photo()).unwrap();
        orchestrator.submit_for_review().unwrap();

        assert!(matches!(
            orchestrator.remove_item(0),
            Err(IntakeError::PreconditionNotMet(_))
        ));
        assert!(matches!(
            orchestrator.mark_validated(0),
            Err(IntakeError::InvalidCallback(_))
        ));
        assert_eq!(orchestrator.queue().len(), 1);
    }

    #[test]
    fn test_reset_keeps_linkage_and_clears_queue() {
        let mut orchestrator = linked();
        orchestrator.start_intake().unwrap();
        orchestrator.add_item(photo()).unwrap();
        orchestrator.submit_for_review().unwrap();

        assert_eq!(orchestrator.reset(), Stage::LinkAccount);
        assert_eq!(orchestrator.stage(), Stage::LinkAccount);
        assert!(orchestrator.queue().is_empty());
        assert!(orchestrator.connection().is_connected());
    }

    #[test]
    fn test_disconnect_blocks_next_start() {
        let mut orchestrator = linked();
        orchestrator.disconnect();
        assert!(orchestrator.start_intake().is_err());
    }

    #[test]
    fn test_publish_requires_linked_account() {
        let mut orchestrator = linked();
        orchestrator.start_intake().unwrap();
        orchestrator.add_item(photo()).unwrap();
        orchestrator.submit_for_review().unwrap();
        orchestrator.disconnect();

        assert_eq!(
            orchestrator.publish(false),
            Err(IntakeError::PreconditionNotMet("listing not approved".to_string()))
        );
        assert_eq!(
            orchestrator.publish(true),
            Err(IntakeError::PreconditionNotMet("account not linked".to_string()))
        );
        assert_eq!(orchestrator.stage(), Stage::Review);

        orchestrator.begin_link().unwrap();
        orchestrator.complete_link("acct-123").unwrap();
        assert_eq!(orchestrator.publish(true), Ok(Stage::Publish));
    }
}
