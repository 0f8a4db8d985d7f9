//! Session state carried across steps and restarts.

use crate::stage::StageKind;
use crate::state::WorkflowState;

/// Everything the engine must persist to resume a session at the exact
/// point it was interrupted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// The single current workflow state.
    pub state: WorkflowState,
    /// The last stage that executed (or `Start` before the first fetch).
    pub stage: StageKind,
    /// Count of executed stages; increments once per stage run.
    pub step: u64,
    /// Whether the session is halted at the review pause point.
    pub paused: bool,
}

impl SessionState {
    /// Fresh session positioned at the virtual entry point.
    #[must_use]
    pub fn fresh(state: WorkflowState) -> Self {
        Self {
            state,
            stage: StageKind::Start,
            step: 0,
            paused: false,
        }
    }
}

/// How a session came into being when it was opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionInit {
    /// A brand new session was created.
    Fresh,
    /// An existing session was restored from its latest checkpoint.
    Resumed { checkpoint_step: u64 },
}

/// Read-only view of a session for the front end.
#[derive(Clone, Debug)]
pub struct StateReport {
    pub state: WorkflowState,
    pub stage: StageKind,
    pub step: u64,
    pub is_paused: bool,
}
