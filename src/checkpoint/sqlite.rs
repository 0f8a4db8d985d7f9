//! SQLite-backed checkpointer.
//!
//! Durable storage for session checkpoints: a denormalized `sessions` row
//! carries the latest snapshot so resume is a single row read, while the
//! `steps` table keeps the full per-stage history. Embedded migrations
//! (`./migrations`) run on connect, so pointing at a fresh file is enough.
//!
//! Storage grows with `sessions × steps_per_session`; delete finished
//! sessions (steps cascade) to reclaim space.

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::checkpoint::{Checkpoint, Checkpointer, CheckpointerError, Result};
use crate::stage::StageKind;
use crate::state::WorkflowState;

/// Checkpoint store on a SQLite database.
pub struct SqliteCheckpointer {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointer").finish()
    }
}

fn backend<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> CheckpointerError + '_ {
    move |e| CheckpointerError::Backend {
        message: format!("{context}: {e}"),
    }
}

impl SqliteCheckpointer {
    /// Connect (or create) a SQLite database at `database_url` and run the
    /// embedded migrations. Example URL: `sqlite://leadflow.db`.
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(backend("connect"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(backend("migrate"))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Full step history for a session, oldest first.
    #[instrument(skip(self), err)]
    pub async fn step_history(&self, session_id: &str) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, step, stage, paused, state_json, created_at
            FROM steps
            WHERE session_id = ?1
            ORDER BY step ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(backend("select steps"))?;

        rows.iter().map(row_to_checkpoint).collect()
    }
}

fn row_to_checkpoint(row: &SqliteRow) -> Result<Checkpoint> {
    let session_id: String = row.get("session_id");
    let step: i64 = row.get("step");
    let stage: String = row.get("stage");
    let paused: bool = row.get("paused");
    let state_json: String = row.get("state_json");
    let created_at: String = row.get("created_at");

    let state: WorkflowState =
        serde_json::from_str(&state_json).map_err(|source| CheckpointerError::Serde { source })?;
    let stage = StageKind::decode(&stage).ok_or_else(|| CheckpointerError::Other {
        message: format!("unknown stage encoding: {stage}"),
    })?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Checkpoint {
        session_id,
        step: step as u64,
        stage,
        paused,
        state,
        created_at,
    })
}

#[async_trait::async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let state_json = serde_json::to_string(&checkpoint.state)
            .map_err(|source| CheckpointerError::Serde { source })?;
        let created_at = checkpoint.created_at.to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(backend("tx begin"))?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id) VALUES (?1)")
            .bind(&checkpoint.session_id)
            .execute(&mut *tx)
            .await
            .map_err(backend("insert session"))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO steps (
                session_id, step, stage, paused, state_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&checkpoint.session_id)
        .bind(checkpoint.step as i64)
        .bind(checkpoint.stage.encode())
        .bind(checkpoint.paused)
        .bind(&state_json)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend("insert step"))?;

        sqlx::query(
            r#"
            UPDATE sessions
            SET last_step = ?2,
                last_stage = ?3,
                last_paused = ?4,
                last_state_json = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&checkpoint.session_id)
        .bind(checkpoint.step as i64)
        .bind(checkpoint.stage.encode())
        .bind(checkpoint.paused)
        .bind(&state_json)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend("update session"))?;

        tx.commit().await.map_err(backend("tx commit"))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT last_step, last_stage, last_paused, last_state_json, updated_at
            FROM sessions
            WHERE id = ?1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend("select latest"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: Option<String> = row
            .try_get("last_state_json")
            .map_err(backend("read last_state_json"))?;
        // Session row exists but nothing has been checkpointed yet.
        let Some(state_json) = state_json else {
            return Ok(None);
        };

        let step: i64 = row.get("last_step");
        let stage: Option<String> = row.try_get("last_stage").map_err(backend("read last_stage"))?;
        let paused: bool = row.get("last_paused");
        let updated_at: Option<String> = row
            .try_get("updated_at")
            .map_err(backend("read updated_at"))?;

        let state: WorkflowState = serde_json::from_str(&state_json)
            .map_err(|source| CheckpointerError::Serde { source })?;
        let stage = match stage.as_deref().and_then(StageKind::decode) {
            Some(stage) => stage,
            None => {
                return Err(CheckpointerError::Other {
                    message: format!("unknown stage encoding: {}", stage.unwrap_or_default()),
                });
            }
        };
        let created_at = updated_at
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Some(Checkpoint {
            session_id: session_id.to_string(),
            step: step as u64,
            stage,
            paused,
            state,
            created_at,
        }))
    }

    #[instrument(skip(self), err)]
    async fn list_sessions(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM sessions ORDER BY updated_at DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(backend("list sessions"))?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
