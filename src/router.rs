//! Conditional routing between workflow stages.
//!
//! The router is a pure function of the last executed stage and the current
//! state. Two edges are conditional (after fetch, after review); the rest
//! are fixed. The machine is a cycle (`fetch … update … fetch`) with one
//! pause point (`review`) and one absorbing terminal (`end`).

use crate::stage::StageKind;
use crate::state::{LeadStatus, WorkflowState};

/// The state machine's edge table.
pub struct Router;

impl Router {
    /// Decide the stage that follows `last` given the current state.
    ///
    /// ```
    /// use leadflow::router::Router;
    /// use leadflow::stage::StageKind;
    /// use leadflow::state::{Mode, WorkflowState};
    ///
    /// let state = WorkflowState::new(Mode::Interactive);
    /// assert_eq!(Router::next(StageKind::Start, &state), StageKind::Fetch);
    /// assert_eq!(Router::next(StageKind::Update, &state), StageKind::Fetch);
    /// ```
    #[must_use]
    pub fn next(last: StageKind, state: &WorkflowState) -> StageKind {
        match last {
            StageKind::Start => StageKind::Fetch,
            StageKind::Fetch => Self::after_fetch(state),
            StageKind::Generate | StageKind::Refine => StageKind::Review,
            StageKind::Review => Self::after_review(state),
            StageKind::Send => StageKind::Update,
            StageKind::Update => StageKind::Fetch,
            StageKind::End => StageKind::End,
        }
    }

    /// Skip straight to the status write when no address was found, end the
    /// session when the source is exhausted.
    fn after_fetch(state: &WorkflowState) -> StageKind {
        if state.status == LeadStatus::End {
            StageKind::End
        } else if state.candidate_emails.is_empty() {
            StageKind::Update
        } else {
            StageKind::Generate
        }
    }

    /// Route on the injected decision. Anything other than a decision
    /// status re-enters review, which the engine treats as "still paused".
    fn after_review(state: &WorkflowState) -> StageKind {
        match state.status {
            LeadStatus::Approved => StageKind::Send,
            LeadStatus::Skipped => StageKind::Update,
            LeadStatus::Refining => StageKind::Refine,
            _ => StageKind::Review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Mode, StagePatch};

    fn state_with(status: LeadStatus, candidates: usize) -> WorkflowState {
        let mut state = WorkflowState::new(Mode::Interactive);
        state.candidate_emails = (0..candidates)
            .map(|i| format!("lead{i}@example.com"))
            .collect();
        state.apply(StagePatch::new().with_status(status));
        state
    }

    #[test]
    fn fetch_routes_on_status_and_candidates() {
        assert_eq!(
            Router::next(StageKind::Fetch, &state_with(LeadStatus::End, 0)),
            StageKind::End
        );
        assert_eq!(
            Router::next(StageKind::Fetch, &state_with(LeadStatus::Drafting, 0)),
            StageKind::Update
        );
        assert_eq!(
            Router::next(StageKind::Fetch, &state_with(LeadStatus::Drafting, 2)),
            StageKind::Generate
        );
    }

    #[test]
    fn review_routes_on_decision() {
        assert_eq!(
            Router::next(StageKind::Review, &state_with(LeadStatus::Approved, 1)),
            StageKind::Send
        );
        assert_eq!(
            Router::next(StageKind::Review, &state_with(LeadStatus::Skipped, 1)),
            StageKind::Update
        );
        assert_eq!(
            Router::next(StageKind::Review, &state_with(LeadStatus::Refining, 1)),
            StageKind::Refine
        );
        // No decision yet: stay at the pause point.
        assert_eq!(
            Router::next(StageKind::Review, &state_with(LeadStatus::Reviewing, 1)),
            StageKind::Review
        );
    }

    #[test]
    fn unconditional_edges() {
        let state = state_with(LeadStatus::Reviewing, 1);
        assert_eq!(Router::next(StageKind::Start, &state), StageKind::Fetch);
        assert_eq!(Router::next(StageKind::Generate, &state), StageKind::Review);
        assert_eq!(Router::next(StageKind::Refine, &state), StageKind::Review);
        assert_eq!(Router::next(StageKind::Send, &state), StageKind::Update);
        assert_eq!(Router::next(StageKind::Update, &state), StageKind::Fetch);
    }

    #[test]
    fn end_is_absorbing() {
        for status in [LeadStatus::Drafting, LeadStatus::Approved, LeadStatus::End] {
            assert_eq!(
                Router::next(StageKind::End, &state_with(status, 1)),
                StageKind::End
            );
        }
    }
}
