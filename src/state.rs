//! Workflow state for the outreach pipeline.
//!
//! A single [`WorkflowState`] is threaded through every stage of a session.
//! Stages never mutate it directly; they return a [`StagePatch`] that the
//! engine merges additively via [`WorkflowState::apply`]; fields a patch
//! does not mention are preserved. This keeps every stage a pure
//! `state -> patch` transformation and makes the whole record trivially
//! serializable for checkpointing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::collaborators::Lead;

/// Execution mode, fixed for the lifetime of a session.
///
/// `Interactive` honors the review pause point and waits for an injected
/// decision; `AutoDraft` synthesizes approvals and never halts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Interactive,
    AutoDraft,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::AutoDraft => write!(f, "auto_draft"),
        }
    }
}

/// Per-lead processing status. Drives all conditional routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// A lead has been fetched and has no draft yet.
    #[default]
    Drafting,
    /// A draft exists and is awaiting a decision.
    Reviewing,
    /// The reviewer (or the autonomous default) accepted the draft.
    Approved,
    /// The reviewer declined the lead.
    Skipped,
    /// Feedback was supplied; the draft is being rewritten.
    Refining,
    /// Delivery succeeded.
    Sent,
    /// Delivery failed or was attempted without a recipient selection.
    Error,
    /// The terminal status for this lead has been recorded.
    Updated,
    /// No unprocessed leads remain; the session is over.
    End,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Drafting => "drafting",
            Self::Reviewing => "reviewing",
            Self::Approved => "approved",
            Self::Skipped => "skipped",
            Self::Refining => "refining",
            Self::Sent => "sent",
            Self::Error => "error",
            Self::Updated => "updated",
            Self::End => "end",
        };
        write!(f, "{s}")
    }
}

/// The single mutable record threaded through every stage of a session.
///
/// One instance is current per session at any time. It is created empty
/// (before the first fetch), repopulated by each fetch, and retired when
/// the next lead arrives or the session reaches its end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkflowState {
    /// Source record of the current lead. Immutable once set for a lead.
    pub row_index: Option<u32>,
    /// Where the terminal status is written back. Set once per lead.
    pub status_column_index: Option<u32>,
    /// Fixed for the whole session.
    pub mode: Mode,
    /// Incremented once per refine run. Diagnostic guard, not a hard limit.
    pub iteration_count: u32,
    pub recipient_name: String,
    pub company_name: String,
    pub position: String,
    /// All addresses discovered for the lead. Empty is valid.
    pub candidate_emails: Vec<String>,
    /// Choice among `candidate_emails`, made at review time or defaulted by
    /// the engine. Cleared when a new lead is fetched.
    pub selected_emails: Option<Vec<String>>,
    /// Static reference content handed to the draft generator. Loaded once
    /// per lead.
    pub resume_context: String,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    /// Set only while transitioning through the refine stage.
    pub user_feedback: Option<String>,
    pub status: LeadStatus,
}

impl WorkflowState {
    /// Initial empty state for a fresh session.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Merge a stage patch into this state. Fields the patch leaves at
    /// their `Keep`/`None` defaults are untouched.
    pub fn apply(&mut self, patch: StagePatch) {
        if let Some(lead) = patch.lead {
            self.row_index = Some(lead.row_index);
            self.status_column_index = Some(lead.status_column_index);
            self.recipient_name = lead.recipient_name;
            self.company_name = lead.company_name;
            self.position = lead.position;
            self.candidate_emails = lead.candidate_emails;
        }
        if let Some(resume_context) = patch.resume_context {
            self.resume_context = resume_context;
        }
        if let Some(iteration_count) = patch.iteration_count {
            self.iteration_count = iteration_count;
        }
        patch.email_subject.apply_to(&mut self.email_subject);
        patch.email_body.apply_to(&mut self.email_body);
        patch.selected_emails.apply_to(&mut self.selected_emails);
        patch.user_feedback.apply_to(&mut self.user_feedback);
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// The recipient selection, if one exists and is non-empty.
    #[must_use]
    pub fn selection(&self) -> Option<&[String]> {
        match self.selected_emails.as_deref() {
            Some(sel) if !sel.is_empty() => Some(sel),
            _ => None,
        }
    }
}

/// Three-way update for an optional state field.
///
/// `Option<T>` alone cannot distinguish "leave untouched" from "clear", and
/// fetch must be able to reset the per-lead fields of the previous lead.
///
/// ```
/// use leadflow::state::Patch;
///
/// let mut slot = Some(1);
/// Patch::Keep.apply_to(&mut slot);
/// assert_eq!(slot, Some(1));
/// Patch::Set(2).apply_to(&mut slot);
/// assert_eq!(slot, Some(2));
/// Patch::<i32>::Clear.apply_to(&mut slot);
/// assert_eq!(slot, None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => *slot = None,
            Self::Set(value) => *slot = Some(value),
        }
    }
}

/// Partial state update returned by a stage run.
///
/// All fields default to "no change"; builders set only what a stage
/// produced. The engine merges patches with [`WorkflowState::apply`].
#[derive(Clone, Debug, Default)]
pub struct StagePatch {
    /// Replaces the lead identity fields (row, recipient, candidates).
    pub lead: Option<Lead>,
    pub resume_context: Option<String>,
    pub iteration_count: Option<u32>,
    pub email_subject: Patch<String>,
    pub email_body: Patch<String>,
    pub selected_emails: Patch<Vec<String>>,
    pub user_feedback: Patch<String>,
    pub status: Option<LeadStatus>,
}

impl StagePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_lead(mut self, lead: Lead) -> Self {
        self.lead = Some(lead);
        self
    }

    #[must_use]
    pub fn with_resume_context(mut self, resume_context: impl Into<String>) -> Self {
        self.resume_context = Some(resume_context.into());
        self
    }

    #[must_use]
    pub fn with_iteration_count(mut self, iteration_count: u32) -> Self {
        self.iteration_count = Some(iteration_count);
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.email_subject = Patch::Set(subject.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.email_body = Patch::Set(body.into());
        self
    }

    #[must_use]
    pub fn clear_draft(mut self) -> Self {
        self.email_subject = Patch::Clear;
        self.email_body = Patch::Clear;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selected: Vec<String>) -> Self {
        self.selected_emails = Patch::Set(selected);
        self
    }

    #[must_use]
    pub fn clear_selection(mut self) -> Self {
        self.selected_emails = Patch::Clear;
        self
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.user_feedback = Patch::Set(feedback.into());
        self
    }

    #[must_use]
    pub fn clear_feedback(mut self) -> Self {
        self.user_feedback = Patch::Clear;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: LeadStatus) -> Self {
        self.status = Some(status);
        self
    }
}
