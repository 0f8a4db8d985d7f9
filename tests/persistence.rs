//! Persisted checkpoint model conversions.

mod common;

use leadflow::checkpoint::Checkpoint;
use leadflow::persistence::{PersistedCheckpoint, PersistenceError};
use leadflow::session::SessionState;
use leadflow::stage::StageKind;
use leadflow::state::{LeadStatus, Mode, StagePatch, WorkflowState};

fn checkpoint() -> Checkpoint {
    let mut state = WorkflowState::new(Mode::AutoDraft);
    state.apply(
        StagePatch::new()
            .with_lead(common::lead(9, "Grace", &["g@y.com"]))
            .with_subject("Hello Grace")
            .with_body("Body")
            .with_status(LeadStatus::Reviewing),
    );
    Checkpoint::from_session(
        "sess1",
        &SessionState {
            state,
            stage: StageKind::Generate,
            step: 4,
            paused: true,
        },
    )
}

#[test]
fn checkpoint_round_trips_through_the_persisted_model() {
    let cp = checkpoint();
    let persisted = PersistedCheckpoint::from(&cp);
    assert_eq!(persisted.stage, "generate");
    assert!(persisted.paused);

    let back = Checkpoint::try_from(persisted).unwrap();
    assert_eq!(back.session_id, cp.session_id);
    assert_eq!(back.step, cp.step);
    assert_eq!(back.stage, cp.stage);
    assert_eq!(back.paused, cp.paused);
    assert_eq!(back.state, cp.state);
    assert_eq!(back.created_at, cp.created_at);
}

#[test]
fn persisted_model_round_trips_through_json() {
    let persisted = PersistedCheckpoint::from(&checkpoint());
    let json = persisted.to_json_string().unwrap();
    let back = PersistedCheckpoint::from_json_str(&json).unwrap();
    assert_eq!(back, persisted);
}

#[test]
fn unknown_stage_encodings_are_rejected() {
    let mut persisted = PersistedCheckpoint::from(&checkpoint());
    persisted.stage = "teleport".to_string();
    let err = Checkpoint::try_from(persisted).unwrap_err();
    assert!(matches!(err, PersistenceError::UnknownStage(s) if s == "teleport"));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = PersistedCheckpoint::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, PersistenceError::Serde { .. }));
}
