//! Per-action file queues in the catalog.
//!
//! Each action is a named queue. A file's entry in it moves
//! pending → processing → completed, or back to pending on failure until
//! its attempts run out.

use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::models::{ActionId, ActionStatus, FileId, Priority, QueuedFile, WorkflowId};

/// Columns of [`QueuedFile`] selected from a `file_action_status` row `q`
/// joined with `files` row `f`.
const QUEUED_FILE_COLUMNS: &str = r#"
    q.file_id, q.action_id, f.path, q.workflow_id, q.status, q.priority,
    q.attempts, q.max_attempts, q.last_error, q.created_at, q.updated_at,
    q.started_at, q.completed_at
"#;

pub struct AddFileRequest {
    pub path: PathBuf,
    pub action_id: ActionId,
    pub size: u64,
    pub priority: Priority,
    pub workflow_id: Option<WorkflowId>,
    pub max_attempts: i32,
}

impl AddFileRequest {
    pub fn new(path: impl Into<PathBuf>, action_id: ActionId) -> Self {
        Self {
            path: path.into(),
            action_id,
            size: 0,
            priority: Priority::default(),
            workflow_id: None,
            max_attempts: 3,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_workflow(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Get or create a workflow by name.
pub async fn ensure_workflow<'e, E>(executor: E, name: &str) -> Result<WorkflowId>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, WorkflowId>(
        r#"
        INSERT INTO workflows (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Get or create an action (queue) by name.
pub async fn ensure_action<'e, E>(executor: E, name: &str) -> Result<ActionId>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, ActionId>(
        r#"
        INSERT INTO actions (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Register a new file and make it pending in an action.
#[tracing::instrument(skip(executor, req), fields(path = %req.path.display(), action_id = %req.action_id, priority = req.priority.value()))]
pub async fn add_file<'e, E>(executor: E, req: AddFileRequest) -> Result<QueuedFile>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        WITH f AS (
            INSERT INTO files (path, file_size, priority, workflow_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, path
        ),
        q AS (
            INSERT INTO file_action_status (file_id, action_id, workflow_id, status, priority, max_attempts)
            SELECT f.id, $5, $4, 'pending'::action_status, $3, $6 FROM f
            RETURNING *
        )
        SELECT {QUEUED_FILE_COLUMNS}
        FROM q JOIN f ON f.id = q.file_id
        "#
    );

    let queued = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(req.path.to_string_lossy().into_owned())
        .bind(i64::try_from(req.size).unwrap_or(i64::MAX))
        .bind(req.priority.value())
        .bind(req.workflow_id)
        .bind(req.action_id)
        .bind(req.max_attempts)
        .fetch_one(executor)
        .await?;

    tracing::info!(file_id = %queued.file_id, "file added");
    Ok(queued)
}

/// Claim the highest-priority pending file of an action using FOR UPDATE SKIP LOCKED.
/// Returns None if no files are pending.
#[tracing::instrument(skip(executor))]
pub async fn claim_file<'e, E>(executor: E, action_id: ActionId) -> Result<Option<QueuedFile>>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        WITH q AS (
            UPDATE file_action_status
            SET status = 'processing', started_at = now(), updated_at = now(),
                attempts = attempts + 1
            WHERE action_id = $1 AND file_id = (
                SELECT file_id FROM file_action_status
                WHERE status = 'pending' AND action_id = $1
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
        )
        SELECT {QUEUED_FILE_COLUMNS}
        FROM q JOIN files f ON f.id = q.file_id
        "#
    );

    let queued = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(action_id)
        .fetch_optional(executor)
        .await?;

    if let Some(ref q) = queued {
        tracing::info!(file_id = %q.file_id, path = %q.path, attempt = q.attempts, "file claimed");
    }
    Ok(queued)
}

/// Mark a processing file as completed.
#[tracing::instrument(skip(executor))]
pub async fn complete_file<'e, E>(
    executor: E,
    file_id: FileId,
    action_id: ActionId,
) -> Result<QueuedFile>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        WITH q AS (
            UPDATE file_action_status
            SET status = 'completed', completed_at = now(), updated_at = now(), last_error = NULL
            WHERE file_id = $1 AND action_id = $2 AND status = 'processing'
            RETURNING *
        )
        SELECT {QUEUED_FILE_COLUMNS}
        FROM q JOIN files f ON f.id = q.file_id
        "#
    );

    let queued = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(file_id)
        .bind(action_id)
        .fetch_optional(executor)
        .await?
        .ok_or(PipelineError::FileNotProcessing { file_id, action_id })?;

    tracing::info!(file_id = %queued.file_id, "file completed");
    Ok(queued)
}

/// Mark a processing file as failed. If attempts < max_attempts, reset to pending for retry.
#[tracing::instrument(skip(executor, error))]
pub async fn fail_file<'e, E>(
    executor: E,
    file_id: FileId,
    action_id: ActionId,
    error: &str,
) -> Result<QueuedFile>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        WITH q AS (
            UPDATE file_action_status
            SET status = CASE
                    WHEN attempts < max_attempts THEN 'pending'::action_status
                    ELSE 'failed'::action_status
                END,
                last_error = $3,
                updated_at = now(),
                completed_at = CASE
                    WHEN attempts >= max_attempts THEN now()
                    ELSE NULL
                END
            WHERE file_id = $1 AND action_id = $2 AND status = 'processing'
            RETURNING *
        )
        SELECT {QUEUED_FILE_COLUMNS}
        FROM q JOIN files f ON f.id = q.file_id
        "#
    );

    let queued = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(file_id)
        .bind(action_id)
        .bind(error)
        .fetch_optional(executor)
        .await?
        .ok_or(PipelineError::FileNotProcessing { file_id, action_id })?;

    match queued.status {
        ActionStatus::Pending => {
            tracing::info!(file_id = %queued.file_id, attempt = queued.attempts, max = queued.max_attempts, "file failed, will retry");
        }
        ActionStatus::Failed => {
            tracing::warn!(file_id = %queued.file_id, attempts = queued.attempts, "file permanently failed after exhausting retries");
        }
        _ => {}
    }
    Ok(queued)
}

/// Get a file's entry in an action.
pub async fn get_status<'e, E>(executor: E, file_id: FileId, action_id: ActionId) -> Result<QueuedFile>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        SELECT {QUEUED_FILE_COLUMNS}
        FROM file_action_status q JOIN files f ON f.id = q.file_id
        WHERE q.file_id = $1 AND q.action_id = $2
        "#
    );

    let queued = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(file_id)
        .bind(action_id)
        .fetch_optional(executor)
        .await?
        .ok_or(PipelineError::FileNotQueued { file_id, action_id })?;

    Ok(queued)
}

/// List an action's files with optional status filter.
pub async fn list_files<'e, E>(
    executor: E,
    action_id: ActionId,
    status: Option<ActionStatus>,
) -> Result<Vec<QueuedFile>>
where
    E: sqlx::PgExecutor<'e>,
{
    let query = format!(
        r#"
        SELECT {QUEUED_FILE_COLUMNS}
        FROM file_action_status q JOIN files f ON f.id = q.file_id
        WHERE q.action_id = $1 AND ($2::action_status IS NULL OR q.status = $2)
        ORDER BY q.priority DESC, q.created_at ASC
        "#
    );

    let files = sqlx::query_as::<_, QueuedFile>(&query)
        .bind(action_id)
        .bind(status)
        .fetch_all(executor)
        .await?;

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_attempts_clamped_to_minimum_1() {
        let req = AddFileRequest::new("/in/a.eml", ActionId(1)).with_max_attempts(0);
        assert_eq!(req.max_attempts, 1);
    }

    #[test]
    fn test_add_file_request_defaults() {
        let req = AddFileRequest::new("/in/a.eml", ActionId(1));
        assert_eq!(req.priority, Priority::default());
        assert_eq!(req.max_attempts, 3);
        assert!(req.workflow_id.is_none());
    }
}
