//! The shared catalog of files, queues, sessions and lineage.
//!
//! Split code only talks to the catalog through [`Catalog`], so the same
//! orchestration runs against PostgreSQL in production and against
//! [`MemoryCatalog`] in tests.

mod memory;
mod postgres;

use std::path::Path;

use async_trait::async_trait;

use crate::error::{PipelineError, Result};
use crate::models::{
    ActionId, ActionStatus, FileId, LineageEdge, RegisterRequest, SessionId, TaskKind, WorkflowId,
};

pub use memory::{MemoryCatalog, SessionCall, StoredFile};
pub use postgres::PgCatalog;

/// Result of trying to add a file to the catalog.
#[derive(Debug)]
pub enum RegisterOutcome {
    Registered(FileId),
    /// The path is already registered.
    NameCollision,
    /// Registration failed for a reason the catalog could not classify.
    Failed(PipelineError),
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Open a processing session for `source_id` in its current action.
    async fn start_session(
        &self,
        kind: TaskKind,
        source_id: FileId,
        action_id: Option<ActionId>,
    ) -> Result<SessionId>;

    async fn end_session(&self, session_id: SessionId, success: bool) -> Result<()>;

    /// Add a file without placing it in any queue.
    async fn register_file(&self, request: &RegisterRequest) -> RegisterOutcome;

    async fn find_file_by_path(&self, path: &Path) -> Result<Option<FileId>>;

    async fn record_lineage(&self, edge: &LineageEdge) -> Result<()>;

    /// Set a file's status in the named action.
    ///
    /// Without `override_processing` a file that is currently processing in
    /// that action is left alone. Returns whether the status was applied.
    async fn set_queue_status(
        &self,
        file_id: FileId,
        action: &str,
        status: ActionStatus,
        workflow_id: Option<WorkflowId>,
        override_processing: bool,
    ) -> Result<bool>;
}
