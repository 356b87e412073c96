use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mailsplit_mime::{BodyFormat, PartRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog identifier of a file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct FileId(pub i64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a named processing queue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct ActionId(pub i32);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct WorkflowId(pub i32);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bookkeeping context correlating everything produced by one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct SessionId(pub Uuid);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a file in one action queue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[sqlx(type_name = "action_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionStatus {
    Unattempted,
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

/// Kind of task a session was opened for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    MimeSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(i32);

impl Priority {
    pub fn new(value: i32) -> Self {
        Self(value.clamp(0, 100))
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(50)
    }
}

/// The composite document being split. Supplied by the caller and not
/// changed during the split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: FileId,
    pub path: PathBuf,
    pub workflow_id: Option<WorkflowId>,
    pub priority: Priority,
    /// Queue the source is currently being processed in.
    pub action_id: Option<ActionId>,
}

impl SourceRecord {
    pub fn new(id: FileId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            workflow_id: None,
            priority: Priority::default(),
            action_id: None,
        }
    }

    pub fn with_workflow(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_action(mut self, action_id: ActionId) -> Self {
        self.action_id = Some(action_id);
        self
    }
}

/// Arguments of a catalog "add file, no queue" call.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub path: PathBuf,
    pub size: u64,
    pub pages: u32,
    pub priority: Priority,
    pub workflow_id: Option<WorkflowId>,
}

impl RegisterRequest {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            pages: 0,
            priority: Priority::default(),
            workflow_id: None,
        }
    }

    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_workflow(mut self, workflow_id: Option<WorkflowId>) -> Self {
        self.workflow_id = workflow_id;
        self
    }

    pub(crate) fn path_str(&self) -> String {
        path_to_catalog(&self.path)
    }
}

/// A part committed to disk and registered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub id: FileId,
    pub path: PathBuf,
    pub role: PartRole,
    pub size: u64,
    /// 0 means unknown or not applicable.
    pub pages: u32,
    /// Lineage ordinal: 1 for the body, attachments follow.
    pub ordinal: i32,
    /// Number of name collisions skipped before this path was accepted.
    pub copy: u32,
}

/// Parent document to child artifact association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LineageEdge {
    pub session_id: SessionId,
    pub parent_path: String,
    pub child_ordinal: i32,
    pub child_file_id: FileId,
}

impl LineageEdge {
    pub fn new(session_id: SessionId, parent: &Path, child_ordinal: i32, child: FileId) -> Self {
        Self {
            session_id,
            parent_path: path_to_catalog(parent),
            child_ordinal,
            child_file_id: child,
        }
    }
}

/// Result of one completed split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub session_id: SessionId,
    pub body_format: BodyFormat,
    pub artifacts: Vec<OutputArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: FileId,
    pub path: String,
    pub file_size: i64,
    pub pages: i32,
    pub priority: i32,
    pub workflow_id: Option<WorkflowId>,
    pub created_at: DateTime<Utc>,
}

/// A file's entry in an action queue, joined with its path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedFile {
    pub file_id: FileId,
    pub action_id: ActionId,
    pub path: String,
    pub workflow_id: Option<WorkflowId>,
    pub status: ActionStatus,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueuedFile {
    /// Source record for splitting this file as part of its action.
    pub fn source_record(&self) -> SourceRecord {
        SourceRecord {
            id: self.file_id,
            path: PathBuf::from(&self.path),
            workflow_id: self.workflow_id,
            priority: Priority::new(self.priority),
            action_id: Some(self.action_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskSession {
    pub id: SessionId,
    pub task_kind: String,
    pub file_id: FileId,
    pub action_id: Option<ActionId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub succeeded: Option<bool>,
}

/// Catalog representation of a filesystem path.
pub(crate) fn path_to_catalog(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
