//! The workflow engine: drives the stage/router loop, owns the review
//! pause point, and exposes the resume/inject-decision surface consumed by
//! a front end.
//!
//! Execution is single-session-single-thread: stages run strictly
//! sequentially, each depending on the previous stage's patch. The engine
//! checkpoints after every stage, so a process killed between stages loses
//! at most the in-flight stage's work and resumes at the identical router
//! decision. The one stage that is not safe to blindly re-run after a
//! crash mid-flight is send, since delivery is an external effect.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::checkpoint::{
    Checkpoint, Checkpointer, CheckpointerError, CheckpointerType, InMemoryCheckpointer,
    restore_session_state,
};
use crate::config::EngineConfig;
use crate::router::Router;
use crate::session::{SessionInit, SessionState, StateReport};
use crate::stage::StageKind;
use crate::stages::{StageError, StageExecutor};
use crate::state::{LeadStatus, Mode, StagePatch, WorkflowState};

/// A decision injected at the review pause point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Accept the draft. `selected` is the recipient choice among the
    /// lead's candidate emails; `None` defers to the engine's default
    /// (the single candidate; several candidates require an explicit
    /// selection).
    Approve { selected: Option<Vec<String>> },
    /// Decline the lead; it is recorded as skipped.
    Skip,
    /// Send the draft back for a rewrite against this feedback.
    Refine { feedback: String },
}

/// The session halted at the review pause point.
#[derive(Clone, Debug)]
pub struct PauseReport {
    pub session_id: String,
    pub step: u64,
    pub state: WorkflowState,
}

/// The session reached its terminal stage.
#[derive(Clone, Debug)]
pub struct FinalReport {
    pub session_id: String,
    pub step: u64,
    pub state: WorkflowState,
}

/// Result of driving a session until it pauses or concludes.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Paused(PauseReport),
    Finished(FinalReport),
}

impl RunOutcome {
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused(_))
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("session not found: {session_id}")]
    #[diagnostic(code(leadflow::engine::session_not_found))]
    SessionNotFound { session_id: String },

    #[error("session {session_id} is not paused at review")]
    #[diagnostic(
        code(leadflow::engine::not_paused),
        help("Decisions can only be injected while the engine is halted at the review stage.")
    )]
    NotPaused { session_id: String },

    #[error("a recipient selection is required ({candidates} candidate emails)")]
    #[diagnostic(
        code(leadflow::engine::selection_required),
        help("Approve with an explicit subset of the lead's candidate emails.")
    )]
    SelectionRequired { candidates: usize },

    #[error("selected email is not a candidate for this lead: {email}")]
    #[diagnostic(code(leadflow::engine::invalid_selection))]
    InvalidSelection { email: String },

    #[error(transparent)]
    #[diagnostic(code(leadflow::engine::stage))]
    Stage(#[from] StageError),

    #[error(transparent)]
    #[diagnostic(code(leadflow::engine::checkpointer))]
    Checkpointer(#[from] CheckpointerError),
}

/// Drives sessions through the stage/router loop.
///
/// Collaborators arrive constructor-injected through the
/// [`StageExecutor`]; the engine itself holds no ambient globals and is
/// scoped to its own lifetime. Sessions are addressed by explicit ids.
pub struct Engine {
    executor: StageExecutor,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    sessions: FxHashMap<String, SessionState>,
    autosave: bool,
}

impl Engine {
    /// Build an engine with the checkpoint backend named by `config`.
    pub async fn new(executor: StageExecutor, config: EngineConfig) -> Self {
        let checkpointer = Self::create_checkpointer(&config).await;
        Self {
            executor,
            checkpointer,
            sessions: FxHashMap::default(),
            autosave: config.autosave,
        }
    }

    /// Build an engine over an existing checkpoint store. This is how a
    /// restarted process reattaches to its persisted sessions.
    #[must_use]
    pub fn with_checkpointer(
        executor: StageExecutor,
        checkpointer: Arc<dyn Checkpointer>,
        autosave: bool,
    ) -> Self {
        Self {
            executor,
            checkpointer: Some(checkpointer),
            sessions: FxHashMap::default(),
            autosave,
        }
    }

    async fn create_checkpointer(config: &EngineConfig) -> Option<Arc<dyn Checkpointer>> {
        match config.checkpointer {
            CheckpointerType::InMemory => Some(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            CheckpointerType::Sqlite => {
                let db_url = std::env::var("LEADFLOW_SQLITE_URL")
                    .ok()
                    .or_else(|| {
                        config
                            .sqlite_db_name
                            .as_ref()
                            .map(|name| format!("sqlite://{name}"))
                    })
                    .unwrap_or_else(|| "sqlite://leadflow.db".to_string());
                // The sqlite driver will not create the file itself.
                if let Some(path) = db_url.strip_prefix("sqlite://") {
                    let path = path.trim();
                    if !path.is_empty() {
                        let p = std::path::Path::new(path);
                        if let Some(parent) = p.parent() {
                            let _ = std::fs::create_dir_all(parent);
                        }
                        if !p.exists() {
                            let _ = std::fs::File::create_new(p);
                        }
                    }
                }
                match crate::checkpoint::sqlite::SqliteCheckpointer::connect(&db_url).await {
                    Ok(cp) => Some(Arc::new(cp) as Arc<dyn Checkpointer>),
                    Err(error) => {
                        tracing::error!(url = %db_url, %error, "sqlite checkpointer initialization failed");
                        None
                    }
                }
            }
        }
    }

    /// Open (or resume) a session and drive it until it pauses at review
    /// or concludes.
    ///
    /// A persisted checkpoint under `session_id` wins over a fresh start;
    /// its stored mode also wins over `mode`, which is logged when they
    /// differ.
    #[instrument(skip(self), err)]
    pub async fn start(&mut self, session_id: &str, mode: Mode) -> Result<RunOutcome, EngineError> {
        let init = self.open_session(session_id, mode).await?;
        tracing::info!(session = %session_id, ?init, "session opened");
        self.run_until_pause(session_id).await
    }

    async fn open_session(
        &mut self,
        session_id: &str,
        mode: Mode,
    ) -> Result<SessionInit, EngineError> {
        if let Some(existing) = self.sessions.get(session_id) {
            return Ok(SessionInit::Resumed {
                checkpoint_step: existing.step,
            });
        }

        if let Some(cp) = &self.checkpointer {
            if let Some(stored) = cp.load_latest(session_id).await? {
                if stored.state.mode != mode {
                    tracing::warn!(
                        session = %session_id,
                        stored = %stored.state.mode,
                        requested = %mode,
                        "session mode is fixed at creation; keeping the stored mode"
                    );
                }
                self.sessions
                    .insert(session_id.to_string(), restore_session_state(&stored));
                return Ok(SessionInit::Resumed {
                    checkpoint_step: stored.step,
                });
            }
        }

        let session = SessionState::fresh(WorkflowState::new(mode));
        self.checkpoint(session_id, &session).await;
        self.sessions.insert(session_id.to_string(), session);
        Ok(SessionInit::Fresh)
    }

    /// Drive the stage/router loop until the review pause point (in
    /// interactive mode, with no decision pending) or the terminal stage.
    #[instrument(skip(self), err)]
    pub async fn run_until_pause(&mut self, session_id: &str) -> Result<RunOutcome, EngineError> {
        let mut session =
            self.sessions
                .remove(session_id)
                .ok_or_else(|| EngineError::SessionNotFound {
                    session_id: session_id.to_string(),
                })?;
        let outcome = self.drive(session_id, &mut session).await;
        self.sessions.insert(session_id.to_string(), session);
        outcome
    }

    async fn drive(
        &self,
        session_id: &str,
        session: &mut SessionState,
    ) -> Result<RunOutcome, EngineError> {
        loop {
            let next = Router::next(session.stage, &session.state);

            if next.is_end() {
                session.stage = StageKind::End;
                session.paused = false;
                self.checkpoint(session_id, session).await;
                tracing::info!(session = %session_id, step = session.step, "session concluded");
                return Ok(RunOutcome::Finished(FinalReport {
                    session_id: session_id.to_string(),
                    step: session.step,
                    state: session.state.clone(),
                }));
            }

            if next == StageKind::Review && session.state.status == LeadStatus::Reviewing {
                match session.state.mode {
                    Mode::Interactive => {
                        session.paused = true;
                        self.checkpoint(session_id, session).await;
                        tracing::info!(
                            session = %session_id,
                            step = session.step,
                            "paused at review awaiting a decision"
                        );
                        return Ok(RunOutcome::Paused(PauseReport {
                            session_id: session_id.to_string(),
                            step: session.step,
                            state: session.state.clone(),
                        }));
                    }
                    Mode::AutoDraft => {
                        // The pause point is never honored: approve with
                        // every candidate address.
                        let selected = session.state.candidate_emails.clone();
                        tracing::debug!(
                            recipients = selected.len(),
                            "autonomous mode: synthesizing approval"
                        );
                        session.state.apply(
                            StagePatch::new()
                                .with_selection(selected)
                                .with_status(LeadStatus::Approved),
                        );
                    }
                }
            }

            tracing::debug!(session = %session_id, stage = %next, step = session.step + 1, "running stage");
            let patch = match self.executor.run(next, &session.state).await {
                Ok(patch) => patch,
                Err(error) => {
                    // Keep the last consistent state reachable for resume.
                    self.checkpoint(session_id, session).await;
                    return Err(error.into());
                }
            };
            session.state.apply(patch);
            session.stage = next;
            session.step += 1;
            session.paused = false;
            self.checkpoint(session_id, session).await;
        }
    }

    /// Inject a review decision into a paused session and resume it.
    #[instrument(skip(self, decision), err)]
    pub async fn inject_decision(
        &mut self,
        session_id: &str,
        decision: Decision,
    ) -> Result<RunOutcome, EngineError> {
        {
            let session =
                self.sessions
                    .get_mut(session_id)
                    .ok_or_else(|| EngineError::SessionNotFound {
                        session_id: session_id.to_string(),
                    })?;
            if !session.paused || session.state.status != LeadStatus::Reviewing {
                return Err(EngineError::NotPaused {
                    session_id: session_id.to_string(),
                });
            }

            let patch = match decision {
                Decision::Approve { selected } => {
                    let resolved =
                        Self::resolve_selection(selected, &session.state.candidate_emails)?;
                    tracing::info!(session = %session_id, recipients = resolved.len(), "draft approved");
                    StagePatch::new()
                        .with_selection(resolved)
                        .with_status(LeadStatus::Approved)
                }
                Decision::Skip => {
                    tracing::info!(session = %session_id, "lead skipped");
                    StagePatch::new()
                        .clear_selection()
                        .with_status(LeadStatus::Skipped)
                }
                Decision::Refine { feedback } => {
                    tracing::info!(session = %session_id, "refinement requested");
                    StagePatch::new()
                        .with_feedback(feedback)
                        .with_status(LeadStatus::Refining)
                }
            };
            session.state.apply(patch);
            session.paused = false;
        }
        self.run_until_pause(session_id).await
    }

    /// Resolve the approve-time recipient selection against the lead's
    /// candidates. With several candidates and no explicit choice, the
    /// caller must disambiguate first.
    fn resolve_selection(
        selected: Option<Vec<String>>,
        candidates: &[String],
    ) -> Result<Vec<String>, EngineError> {
        match selected {
            Some(selection) => {
                if selection.is_empty() {
                    return Err(EngineError::SelectionRequired {
                        candidates: candidates.len(),
                    });
                }
                for email in &selection {
                    if !candidates.contains(email) {
                        return Err(EngineError::InvalidSelection {
                            email: email.clone(),
                        });
                    }
                }
                Ok(selection)
            }
            None => match candidates {
                [only] => Ok(vec![only.clone()]),
                _ => Err(EngineError::SelectionRequired {
                    candidates: candidates.len(),
                }),
            },
        }
    }

    /// Read-only view of a session for the front end.
    #[must_use]
    pub fn get_state(&self, session_id: &str) -> Option<StateReport> {
        self.sessions.get(session_id).map(|session| StateReport {
            state: session.state.clone(),
            stage: session.stage,
            step: session.step,
            is_paused: session.paused,
        })
    }

    /// Whether the session is halted at the review pause point.
    #[must_use]
    pub fn is_paused(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|session| session.paused)
    }

    /// Ids of the sessions this engine currently holds in memory.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<&String> {
        self.sessions.keys().collect()
    }

    async fn checkpoint(&self, session_id: &str, session: &SessionState) {
        if !self.autosave {
            return;
        }
        let Some(cp) = &self.checkpointer else {
            return;
        };
        if let Err(error) = cp.save(Checkpoint::from_session(session_id, session)).await {
            tracing::warn!(session = %session_id, %error, "checkpoint save failed");
        }
    }
}
