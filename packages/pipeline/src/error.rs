use std::path::PathBuf;

use thiserror::Error;

use crate::models::{ActionId, FileId, SessionId};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to start session for source file {source_id}: {source}")]
    SessionStart {
        source_id: FileId,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("failed to register {}: {source}", path.display())]
    Registration {
        path: PathBuf,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("failed to record lineage of child {ordinal} for {}: {source}", path.display())]
    Lineage {
        path: PathBuf,
        ordinal: i32,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("failed to read source file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decompose source file {}: {source}", path.display())]
    Decompose {
        path: PathBuf,
        #[source]
        source: mailsplit_mime::MimeError,
    },

    #[error("failed to write output file {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("file {file_id} has no status for action {action_id}")]
    FileNotQueued { file_id: FileId, action_id: ActionId },

    #[error("file {file_id} is not in processing state for action {action_id}")]
    FileNotProcessing { file_id: FileId, action_id: ActionId },

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("page count failed: {0}")]
    PageCount(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
