//! MailSplit pipeline - split email messages into catalogued output files.
//!
//! [`Splitter`] turns one source message into a body file and one file per
//! attachment, each registered under a unique name in the [`Catalog`],
//! linked to the source by a lineage edge and queued for the next action.
//! [`worker::run_split_worker`] drives it from an action queue.

pub mod action_queue;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod lineage;
pub mod models;
pub mod naming;
pub mod page_count;
pub mod registrar;
pub mod splitter;
pub mod worker;

pub use catalog::{Catalog, MemoryCatalog, PgCatalog, RegisterOutcome};
pub use config::{PipelineConfig, SplitConfig, WorkerConfig};
pub use db::{create_pool, run_migrations};
pub use error::PipelineError;
pub use models::{
    ActionId, ActionStatus, FileId, LineageEdge, OutputArtifact, Priority, SessionId,
    SourceRecord, SplitOutcome, WorkflowId,
};
pub use page_count::{HeuristicPageCounter, NoPageCounter, PageCounter};
pub use splitter::Splitter;
