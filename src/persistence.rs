//! Serde-friendly persisted models for checkpoints.
//!
//! Explicit persisted shapes decoupled from the in-memory types, so storage
//! backends stay lean and declarative: the stage is kept in its
//! [`StageKind::encode`] string form and the timestamp as RFC3339 text.
//! This module performs no I/O.

use chrono::Utc;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint::Checkpoint;
use crate::stage::StageKind;
use crate::state::WorkflowState;

/// Persisted form of a [`Checkpoint`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub session_id: String,
    pub step: u64,
    /// Stage in `StageKind::encode()` form.
    pub stage: String,
    #[serde(default)]
    pub paused: bool,
    pub state: WorkflowState,
    /// RFC3339 creation time (keeps `chrono::DateTime` out of the
    /// serialized shape).
    pub created_at: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(leadflow::persistence::serde),
        help("Ensure the JSON structure matches PersistedCheckpoint.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown stage encoding: {0}")]
    #[diagnostic(
        code(leadflow::persistence::unknown_stage),
        help("The checkpoint was written by an incompatible version.")
    )]
    UnknownStage(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            session_id: cp.session_id.clone(),
            step: cp.step,
            stage: cp.stage.encode().to_string(),
            paused: cp.paused,
            state: cp.state.clone(),
            created_at: cp.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(p: PersistedCheckpoint) -> Result<Self> {
        let stage =
            StageKind::decode(&p.stage).ok_or_else(|| PersistenceError::UnknownStage(p.stage.clone()))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&p.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(Checkpoint {
            session_id: p.session_id,
            step: p.step,
            stage,
            paused: p.paused,
            state: p.state,
            created_at,
        })
    }
}

impl PersistedCheckpoint {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| PersistenceError::Serde { source })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|source| PersistenceError::Serde { source })
    }
}
