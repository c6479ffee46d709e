//! Test helpers: a recording observer and orchestrators in common starting states.
//!
//! Run from workspace root: `cargo test -p cardlister-core --test workflow_test`.

use std::sync::{Arc, Mutex};

use cardlister_core::{
    IntakeLimits, IntakeObserver, LinkAttempt, RawPhoto, RejectReason, Stage, StageOrchestrator,
    StageTransition,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StageChanged { from: Stage, to: Stage },
    LinkRequested(Uuid),
    ItemRejected(RejectReason),
}

/// Observer that keeps every callback for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn stage_changes(&self) -> Vec<(Stage, Stage)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::StageChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl IntakeObserver for RecordingObserver {
    fn on_stage_changed(&self, transition: &StageTransition) {
        self.push(Event::StageChanged {
            from: transition.from,
            to: transition.to,
        });
    }

    fn on_link_requested(&self, _session_id: Uuid, attempt: &LinkAttempt) {
        self.push(Event::LinkRequested(attempt.attempt_id));
    }

    fn on_item_rejected(&self, _session_id: Uuid, reason: &RejectReason) {
        self.push(Event::ItemRejected(reason.clone()));
    }
}

/// Install a fmt subscriber once so `RUST_LOG=debug` shows core events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn observed_orchestrator() -> (StageOrchestrator, Arc<RecordingObserver>) {
    init_tracing();
    let observer = Arc::new(RecordingObserver::default());
    let orchestrator =
        StageOrchestrator::new(IntakeLimits::default()).with_observer(observer.clone());
    (orchestrator, observer)
}

/// Orchestrator with a linked account, still at LINK_ACCOUNT
pub fn linked_orchestrator() -> (StageOrchestrator, Arc<RecordingObserver>) {
    let (mut orchestrator, observer) = observed_orchestrator();
    orchestrator.begin_link().unwrap();
    orchestrator.complete_link("acct-123").unwrap();
    (orchestrator, observer)
}

pub fn jpeg(name: &str, size: usize) -> RawPhoto {
    RawPhoto::new(name, "image/jpeg", vec![0xFFu8; size])
}
