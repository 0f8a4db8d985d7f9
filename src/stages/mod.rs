//! Stage handlers for the outreach workflow.
//!
//! Each executable [`StageKind`] has one handler implementing
//! [`StageHandler`]: a pure transformation from the current
//! [`WorkflowState`] to a [`StagePatch`], with at most one collaborator
//! call. Collaborator failures are downgraded to state transitions at the
//! stage boundary; a fetch outage is the only error that propagates and
//! aborts the session.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::collaborators::{Dispatcher, DraftGenerator, FetchError, LeadSource};
use crate::stage::StageKind;
use crate::state::{LeadStatus, StagePatch, WorkflowState};

/// Refine runs past this count are logged as a likely runaway loop. The
/// count itself is never enforced as a hard cap.
pub const REFINE_SOFT_GUARD: u32 = 5;

/// Fatal stage failures. Everything recoverable is expressed as a patch.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    /// The lead source is unreachable; the session cannot continue.
    #[error(transparent)]
    #[diagnostic(code(leadflow::stages::fetch))]
    Fetch(#[from] FetchError),

    /// A stage ran without data a prior stage was required to produce.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(leadflow::stages::missing_input),
        help("Check that routing reached this stage through a valid edge.")
    )]
    MissingInput { what: &'static str },

    /// The virtual endpoints have no handler.
    #[error("stage {stage} is not executable")]
    #[diagnostic(code(leadflow::stages::not_executable))]
    NotExecutable { stage: StageKind },
}

/// A single unit of work in the per-lead cycle.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn run(&self, state: &WorkflowState) -> Result<StagePatch, StageError>;
}

/// Static reference content handed to the draft generator, reloaded once
/// per lead so edits to the backing file take effect mid-session.
#[derive(Clone, Debug)]
pub enum ReferenceContext {
    Inline(String),
    File(PathBuf),
}

impl ReferenceContext {
    pub fn inline(content: impl Into<String>) -> Self {
        Self::Inline(content.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Load the reference content. A missing or unreadable file degrades to
    /// a placeholder rather than failing the pipeline.
    #[must_use]
    pub fn load(&self) -> String {
        match self {
            Self::Inline(content) => content.clone(),
            Self::File(path) => match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "reference content unavailable");
                    format!("Reference content not found at {}.", path.display())
                }
            },
        }
    }
}

/// Pulls the next lead and resets the per-lead fields.
pub struct FetchStage {
    leads: Arc<dyn LeadSource>,
    reference: ReferenceContext,
}

#[async_trait]
impl StageHandler for FetchStage {
    #[instrument(skip_all, err)]
    async fn run(&self, _state: &WorkflowState) -> Result<StagePatch, StageError> {
        match self.leads.next().await? {
            None => {
                tracing::info!("no unprocessed lead remains");
                Ok(StagePatch::new().with_status(LeadStatus::End))
            }
            Some(lead) => {
                tracing::info!(
                    row = lead.row_index,
                    recipient = %lead.recipient_name,
                    candidates = lead.candidate_emails.len(),
                    "lead fetched"
                );
                Ok(StagePatch::new()
                    .with_lead(lead)
                    .with_resume_context(self.reference.load())
                    .with_iteration_count(0)
                    .clear_draft()
                    .clear_selection()
                    .clear_feedback()
                    .with_status(LeadStatus::Drafting))
            }
        }
    }
}

/// Produces the initial draft. Generator failure degrades to a placeholder
/// so the lead stays reviewable.
pub struct GenerateStage {
    drafts: Arc<dyn DraftGenerator>,
}

#[async_trait]
impl StageHandler for GenerateStage {
    #[instrument(skip_all, fields(recipient = %state.recipient_name))]
    async fn run(&self, state: &WorkflowState) -> Result<StagePatch, StageError> {
        let draft = self
            .drafts
            .create_draft(
                &state.recipient_name,
                &state.company_name,
                &state.position,
                &state.resume_context,
            )
            .await;
        let patch = match draft {
            Ok(draft) => StagePatch::new()
                .with_subject(draft.subject)
                .with_body(draft.body),
            Err(error) => {
                tracing::warn!(%error, "draft generation failed; falling back to placeholder");
                StagePatch::new()
                    .with_subject(format!(
                        "Outreach to {} ({})",
                        state.recipient_name, state.company_name
                    ))
                    .with_body(format!(
                        "[draft unavailable: {error}]\n\nWrite or refine this message before sending."
                    ))
            }
        };
        Ok(patch.with_status(LeadStatus::Reviewing))
    }
}

/// The named pause point. Never mutates state; all mutation arrives through
/// the decision the engine injects.
pub struct ReviewStage;

#[async_trait]
impl StageHandler for ReviewStage {
    async fn run(&self, _state: &WorkflowState) -> Result<StagePatch, StageError> {
        Ok(StagePatch::new())
    }
}

/// Rewrites the draft against the reviewer's feedback.
pub struct RefineStage {
    drafts: Arc<dyn DraftGenerator>,
}

#[async_trait]
impl StageHandler for RefineStage {
    #[instrument(skip_all, fields(iteration = state.iteration_count), err)]
    async fn run(&self, state: &WorkflowState) -> Result<StagePatch, StageError> {
        let feedback = state
            .user_feedback
            .as_deref()
            .ok_or(StageError::MissingInput {
                what: "user_feedback",
            })?;
        let subject = state.email_subject.as_deref().unwrap_or_default();
        let body = state.email_body.as_deref().unwrap_or_default();
        let iteration_count = state.iteration_count + 1;
        if iteration_count > REFINE_SOFT_GUARD {
            tracing::warn!(iteration_count, "refine loop exceeded the soft guard");
        }

        let patch = match self.drafts.revise_draft(subject, body, feedback).await {
            Ok(draft) => StagePatch::new()
                .with_subject(draft.subject)
                .with_body(draft.body),
            Err(error) => {
                tracing::warn!(%error, "draft revision failed");
                StagePatch::new().with_body(format!("[revision failed: {error}]"))
            }
        };
        Ok(patch
            .with_iteration_count(iteration_count)
            .clear_feedback()
            .with_status(LeadStatus::Reviewing))
    }
}

/// Delivers the approved draft in a single combined call: all recipients
/// succeed or the whole lead is marked errored.
pub struct SendStage {
    dispatcher: Arc<dyn Dispatcher>,
}

#[async_trait]
impl StageHandler for SendStage {
    #[instrument(skip_all, fields(row = state.row_index))]
    async fn run(&self, state: &WorkflowState) -> Result<StagePatch, StageError> {
        let Some(recipients) = state.selection() else {
            tracing::warn!("send reached without a recipient selection");
            return Ok(StagePatch::new().with_status(LeadStatus::Error));
        };
        let subject = state.email_subject.as_deref().unwrap_or_default();
        let body = state.email_body.as_deref().unwrap_or_default();

        match self.dispatcher.deliver(recipients, subject, body).await {
            Ok(()) => {
                tracing::info!(recipients = recipients.len(), "delivery complete");
                Ok(StagePatch::new().with_status(LeadStatus::Sent))
            }
            Err(error) => {
                tracing::warn!(%error, "delivery failed; marking lead errored");
                Ok(StagePatch::new().with_status(LeadStatus::Error))
            }
        }
    }
}

/// Records the lead's terminal status and closes the per-lead cycle.
pub struct UpdateStage {
    leads: Arc<dyn LeadSource>,
}

#[async_trait]
impl StageHandler for UpdateStage {
    #[instrument(skip_all, fields(row = state.row_index, status = %state.status))]
    async fn run(&self, state: &WorkflowState) -> Result<StagePatch, StageError> {
        let mut effective = state.status;
        if effective == LeadStatus::Drafting && state.candidate_emails.is_empty() {
            tracing::info!("no candidate emails; reclassifying as skipped");
            effective = LeadStatus::Skipped;
        }

        let text = match effective {
            LeadStatus::Sent => Some(format!("Sent: {}", Utc::now().format("%Y-%m-%d %H:%M"))),
            LeadStatus::Skipped => Some("Skipped - No Email".to_string()),
            _ => None,
        };

        if let Some(text) = text {
            match (state.row_index, state.status_column_index) {
                (Some(row), Some(column)) => {
                    if let Err(error) = self.leads.record_status(row, column, &text).await {
                        tracing::warn!(row, %error, "status write failed; continuing");
                    } else {
                        tracing::debug!(row, %text, "status recorded");
                    }
                }
                _ => tracing::warn!("no lead row to record status against"),
            }
        }

        Ok(StagePatch::new().with_status(LeadStatus::Updated))
    }
}

/// Owns the six handlers and the collaborator handles behind them,
/// dispatching by [`StageKind`].
pub struct StageExecutor {
    fetch: FetchStage,
    generate: GenerateStage,
    review: ReviewStage,
    refine: RefineStage,
    send: SendStage,
    update: UpdateStage,
}

impl StageExecutor {
    pub fn new(
        leads: Arc<dyn LeadSource>,
        drafts: Arc<dyn DraftGenerator>,
        dispatcher: Arc<dyn Dispatcher>,
        reference: ReferenceContext,
    ) -> Self {
        Self {
            fetch: FetchStage {
                leads: leads.clone(),
                reference,
            },
            generate: GenerateStage {
                drafts: drafts.clone(),
            },
            review: ReviewStage,
            refine: RefineStage { drafts },
            send: SendStage { dispatcher },
            update: UpdateStage { leads },
        }
    }

    /// Run the handler for `stage` against the current state.
    pub async fn run(
        &self,
        stage: StageKind,
        state: &WorkflowState,
    ) -> Result<StagePatch, StageError> {
        match stage {
            StageKind::Fetch => self.fetch.run(state).await,
            StageKind::Generate => self.generate.run(state).await,
            StageKind::Review => self.review.run(state).await,
            StageKind::Refine => self.refine.run(state).await,
            StageKind::Send => self.send.run(state).await,
            StageKind::Update => self.update.run(state).await,
            StageKind::Start | StageKind::End => Err(StageError::NotExecutable { stage }),
        }
    }
}
