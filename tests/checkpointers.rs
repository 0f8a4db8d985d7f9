//! In-memory checkpointer behavior and session restore.

mod common;

use leadflow::checkpoint::{
    Checkpoint, Checkpointer, InMemoryCheckpointer, restore_session_state,
};
use leadflow::session::SessionState;
use leadflow::stage::StageKind;
use leadflow::state::{LeadStatus, Mode, StagePatch, WorkflowState};

fn session_at(stage: StageKind, step: u64, paused: bool) -> SessionState {
    let mut state = WorkflowState::new(Mode::Interactive);
    state.apply(
        StagePatch::new()
            .with_lead(common::lead(2, "Ada", &["a@x.com"]))
            .with_subject("Hello")
            .with_body("Body")
            .with_status(LeadStatus::Reviewing),
    );
    SessionState {
        state,
        stage,
        step,
        paused,
    }
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let store = InMemoryCheckpointer::new();
    let session = session_at(StageKind::Generate, 2, true);

    store
        .save(Checkpoint::from_session("sess1", &session))
        .await
        .unwrap();

    let loaded = store.load_latest("sess1").await.unwrap().unwrap();
    assert_eq!(loaded.step, 2);
    assert_eq!(loaded.stage, StageKind::Generate);
    assert!(loaded.paused);
    assert_eq!(loaded.state, session.state);

    let restored = restore_session_state(&loaded);
    assert_eq!(restored, session);
}

#[tokio::test]
async fn latest_wins_and_same_step_is_replaced() {
    let store = InMemoryCheckpointer::new();
    store
        .save(Checkpoint::from_session(
            "sess1",
            &session_at(StageKind::Fetch, 1, false),
        ))
        .await
        .unwrap();
    store
        .save(Checkpoint::from_session(
            "sess1",
            &session_at(StageKind::Generate, 2, false),
        ))
        .await
        .unwrap();
    // The pause checkpoint re-saves step 2 with the paused flag set.
    store
        .save(Checkpoint::from_session(
            "sess1",
            &session_at(StageKind::Generate, 2, true),
        ))
        .await
        .unwrap();

    let loaded = store.load_latest("sess1").await.unwrap().unwrap();
    assert_eq!(loaded.step, 2);
    assert!(loaded.paused);
    assert_eq!(store.step_history("sess1").len(), 2);
}

#[tokio::test]
async fn missing_session_loads_nothing() {
    let store = InMemoryCheckpointer::new();
    assert!(store.load_latest("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn list_sessions_names_every_saved_session() {
    let store = InMemoryCheckpointer::new();
    let session = session_at(StageKind::Fetch, 1, false);
    store
        .save(Checkpoint::from_session("alpha", &session))
        .await
        .unwrap();
    store
        .save(Checkpoint::from_session("beta", &session))
        .await
        .unwrap();

    let mut ids = store.list_sessions().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["alpha", "beta"]);
}
