//! Engine configuration.

use uuid::Uuid;

use crate::checkpoint::CheckpointerType;

/// Runtime configuration for an [`Engine`](crate::engine::Engine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Which checkpoint backend to create.
    pub checkpointer: CheckpointerType,
    /// Database file for the sqlite backend. Resolved from
    /// `SQLITE_DB_NAME` (via `.env`) when not provided.
    pub sqlite_db_name: Option<String>,
    /// Persist a checkpoint after every stage run.
    pub autosave: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkpointer: CheckpointerType::default(),
            sqlite_db_name: Self::resolve_sqlite_db_name(None),
            autosave: true,
        }
    }
}

impl EngineConfig {
    fn resolve_sqlite_db_name(provided: Option<String>) -> Option<String> {
        if provided.is_some() {
            return provided;
        }
        dotenvy::dotenv().ok();
        Some(std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "leadflow.db".to_string()))
    }

    #[must_use]
    pub fn new(checkpointer: CheckpointerType) -> Self {
        Self {
            checkpointer,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sqlite_db_name(mut self, name: impl Into<String>) -> Self {
        self.sqlite_db_name = Self::resolve_sqlite_db_name(Some(name.into()));
        self
    }

    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Fresh session identifier for callers that do not bring their own.
    #[must_use]
    pub fn generate_session_id() -> String {
        format!("session-{}", Uuid::new_v4())
    }
}
