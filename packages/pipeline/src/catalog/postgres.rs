use std::path::Path;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Catalog, RegisterOutcome};
use crate::error::{PipelineError, Result};
use crate::models::{
    path_to_catalog, ActionId, ActionStatus, FileId, FileRecord, LineageEdge, RegisterRequest,
    SessionId, TaskKind, TaskSession, WorkflowId,
};

/// Catalog backed by the PostgreSQL schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get_file(&self, file_id: FileId) -> Result<FileRecord> {
        sqlx::query_as::<_, FileRecord>(r#"SELECT * FROM files WHERE id = $1"#)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PipelineError::FileNotFound(file_id))
    }

    pub async fn get_session(&self, session_id: SessionId) -> Result<TaskSession> {
        sqlx::query_as::<_, TaskSession>(r#"SELECT * FROM task_sessions WHERE id = $1"#)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PipelineError::SessionNotFound(session_id))
    }

    /// Lineage edges recorded for a parent document, oldest first.
    pub async fn lineage_for(&self, parent: &Path) -> Result<Vec<LineageEdge>> {
        let edges = sqlx::query_as::<_, LineageEdge>(
            r#"
            SELECT session_id, parent_path, child_ordinal, child_file_id
            FROM file_lineage
            WHERE parent_path = $1
            ORDER BY id ASC
            "#,
        )
        .bind(path_to_catalog(parent))
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    async fn action_id(&self, name: &str) -> Result<ActionId> {
        sqlx::query_scalar::<_, ActionId>(r#"SELECT id FROM actions WHERE name = $1"#)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PipelineError::ActionNotFound(name.to_string()))
    }

    async fn find_file(&self, file_id: FileId) -> Result<Option<FileId>> {
        let found = sqlx::query_scalar::<_, FileId>(r#"SELECT id FROM files WHERE id = $1"#)
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    #[tracing::instrument(skip(self))]
    async fn start_session(
        &self,
        kind: TaskKind,
        source_id: FileId,
        action_id: Option<ActionId>,
    ) -> Result<SessionId> {
        let session_id = sqlx::query_scalar::<_, SessionId>(
            r#"
            INSERT INTO task_sessions (task_kind, file_id, action_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(kind.to_string())
        .bind(source_id)
        .bind(action_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(%session_id, "session started");
        Ok(session_id)
    }

    #[tracing::instrument(skip(self))]
    async fn end_session(&self, session_id: SessionId, success: bool) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE task_sessions
            SET ended_at = now(), succeeded = $2
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(success)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::SessionNotFound(session_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(path = %request.path.display()))]
    async fn register_file(&self, request: &RegisterRequest) -> RegisterOutcome {
        let inserted = sqlx::query_scalar::<_, FileId>(
            r#"
            INSERT INTO files (path, file_size, pages, priority, workflow_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(request.path_str())
        .bind(i64::try_from(request.size).unwrap_or(i64::MAX))
        .bind(i32::try_from(request.pages).unwrap_or(i32::MAX))
        .bind(request.priority.value())
        .bind(request.workflow_id)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(file_id) => RegisterOutcome::Registered(file_id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                RegisterOutcome::NameCollision
            }
            Err(e) => RegisterOutcome::Failed(e.into()),
        }
    }

    async fn find_file_by_path(&self, path: &Path) -> Result<Option<FileId>> {
        let file_id = sqlx::query_scalar::<_, FileId>(r#"SELECT id FROM files WHERE path = $1"#)
            .bind(path_to_catalog(path))
            .fetch_optional(&self.pool)
            .await?;

        Ok(file_id)
    }

    #[tracing::instrument(skip(self, edge), fields(session_id = %edge.session_id, ordinal = edge.child_ordinal))]
    async fn record_lineage(&self, edge: &LineageEdge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO file_lineage (session_id, parent_path, child_ordinal, child_file_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(edge.session_id)
        .bind(&edge.parent_path)
        .bind(edge.child_ordinal)
        .bind(edge.child_file_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_queue_status(
        &self,
        file_id: FileId,
        action: &str,
        status: ActionStatus,
        workflow_id: Option<WorkflowId>,
        override_processing: bool,
    ) -> Result<bool> {
        let action_id = self.action_id(action).await?;

        let applied = sqlx::query_scalar::<_, FileId>(
            r#"
            INSERT INTO file_action_status (file_id, action_id, workflow_id, status, priority)
            SELECT f.id, $2, $3, $4, f.priority
            FROM files f
            WHERE f.id = $1
            ON CONFLICT (file_id, action_id) DO UPDATE
            SET status = EXCLUDED.status,
                workflow_id = COALESCE(EXCLUDED.workflow_id, file_action_status.workflow_id),
                attempts = CASE
                    WHEN EXCLUDED.status = 'pending' THEN 0
                    ELSE file_action_status.attempts
                END,
                last_error = NULL,
                started_at = NULL,
                completed_at = NULL,
                updated_at = now()
            WHERE $5::boolean OR file_action_status.status <> 'processing'
            RETURNING file_id
            "#,
        )
        .bind(file_id)
        .bind(action_id)
        .bind(workflow_id)
        .bind(status)
        .bind(override_processing)
        .fetch_optional(&self.pool)
        .await?;

        if applied.is_some() {
            tracing::info!(%file_id, action, %status, "queue status set");
            return Ok(true);
        }

        // Nothing written: either the file is unknown or it is mid-processing
        if self.find_file(file_id).await?.is_none() {
            return Err(PipelineError::FileNotFound(file_id));
        }
        tracing::debug!(%file_id, action, "file is processing, status left unchanged");
        Ok(false)
    }
}
