//! Checkpoint persistence for resumable sessions.
//!
//! A [`Checkpoint`] is a snapshot of a session after one stage run (or at
//! the review pause): the full workflow state, the last executed stage, and
//! the paused flag, keyed by session id. The engine saves one after every
//! stage, so a killed process loses at most the in-flight stage's work.
//!
//! [`Checkpointer`] is the pluggable storage trait; [`InMemoryCheckpointer`]
//! is the volatile default and [`SqliteCheckpointer`](sqlite::SqliteCheckpointer)
//! the durable backend behind the `sqlite` feature.

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::session::SessionState;
use crate::stage::StageKind;
use crate::state::WorkflowState;

/// Storage backend selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CheckpointerType {
    #[default]
    InMemory,
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// One persisted snapshot of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub session_id: String,
    pub step: u64,
    pub stage: StageKind,
    pub paused: bool,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot the given session under `session_id`.
    #[must_use]
    pub fn from_session(session_id: &str, session: &SessionState) -> Self {
        Self {
            session_id: session_id.to_string(),
            step: session.step,
            stage: session.stage,
            paused: session.paused,
            state: session.state.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Rebuild in-memory session state from a stored checkpoint.
#[must_use]
pub fn restore_session_state(checkpoint: &Checkpoint) -> SessionState {
    SessionState {
        state: checkpoint.state.clone(),
        stage: checkpoint.stage,
        step: checkpoint.step,
        paused: checkpoint.paused,
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(leadflow::checkpoint::backend))]
    Backend { message: String },

    #[error("checkpoint serialization failed: {source}")]
    #[diagnostic(
        code(leadflow::checkpoint::serde),
        help("The persisted state shape must match the current WorkflowState.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint error: {message}")]
    #[diagnostic(code(leadflow::checkpoint::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Pluggable persistence: a key-value mapping from session id to the
/// serialized session snapshot (plus history, backend permitting).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist a checkpoint. Re-saving the same step replaces it.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint for a session, if any.
    async fn load_latest(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// All known session ids.
    async fn list_sessions(&self) -> Result<Vec<String>>;
}

/// Volatile checkpoint store for tests and development. Keeps the full
/// step history per session.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    inner: Mutex<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full step history for a session, in save order.
    #[must_use]
    pub fn step_history(&self, session_id: &str) -> Vec<Checkpoint> {
        self.inner
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut guard = self.inner.lock();
        let history = guard.entry(checkpoint.session_id.clone()).or_default();
        // Steps only ever grow, so replacing in place keeps history ordered.
        if let Some(slot) = history.iter_mut().find(|c| c.step == checkpoint.step) {
            *slot = checkpoint;
        } else {
            history.push(checkpoint);
        }
        Ok(())
    }

    async fn load_latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .inner
            .lock()
            .get(session_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().keys().cloned().collect())
    }
}
