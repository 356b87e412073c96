use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Catalog, RegisterOutcome};
use crate::error::{PipelineError, Result};
use crate::models::{
    ActionId, ActionStatus, FileId, LineageEdge, Priority, RegisterRequest, SessionId, TaskKind,
    WorkflowId,
};

/// A file registered in a [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
    pub path: PathBuf,
    pub size: u64,
    pub pages: u32,
    pub priority: Priority,
    pub workflow_id: Option<WorkflowId>,
}

/// A session call observed by a [`MemoryCatalog`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Started {
        session_id: SessionId,
        kind: TaskKind,
        source_id: FileId,
        action_id: Option<ActionId>,
    },
    Ended {
        session_id: SessionId,
        success: bool,
    },
}

#[derive(Debug, Default, Clone)]
struct Faults {
    session_start: bool,
    session_end: bool,
    /// Fail every registration once this many have succeeded.
    registration_after: Option<usize>,
    collisions_as_failures: bool,
    lookup: bool,
    lineage: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_file_id: i64,
    files: Vec<StoredFile>,
    by_path: HashMap<PathBuf, FileId>,
    registrations: usize,
    sessions: Vec<SessionCall>,
    lineage: Vec<LineageEdge>,
    statuses: HashMap<(FileId, String), ActionStatus>,
}

/// In-process [`Catalog`] with fault injection, for running splits without
/// a database.
///
/// Paths are unique like in the real catalog. Every call is recorded so
/// tests can assert on what a split did.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<MemoryState>,
    faults: Faults,
    /// `None` accepts any action name.
    known_actions: Option<HashSet<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept these action names in `set_queue_status`.
    pub fn with_known_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_failing_session_start(mut self) -> Self {
        self.faults.session_start = true;
        self
    }

    pub fn with_failing_session_end(mut self) -> Self {
        self.faults.session_end = true;
        self
    }

    /// Make every registration fail as if the catalog were unreachable.
    pub fn with_failing_registration(self) -> Self {
        self.with_failing_registration_after(0)
    }

    /// Let `successes` registrations through, then fail every later one.
    pub fn with_failing_registration_after(mut self, successes: usize) -> Self {
        self.faults.registration_after = Some(successes);
        self
    }

    /// Report duplicate paths as unclassified failures instead of
    /// [`RegisterOutcome::NameCollision`].
    pub fn with_collisions_as_failures(mut self) -> Self {
        self.faults.collisions_as_failures = true;
        self
    }

    /// Make `find_file_by_path` fail.
    pub fn with_failing_lookup(mut self) -> Self {
        self.faults.lookup = true;
        self
    }

    pub fn with_failing_lineage(mut self) -> Self {
        self.faults.lineage = true;
        self
    }

    /// Register a path directly, bypassing fault injection.
    pub fn insert_existing(&self, path: impl Into<PathBuf>) -> FileId {
        let mut state = self.state();
        let request = RegisterRequest::new(path, 0);
        state.insert(&request)
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.state().files.clone()
    }

    pub fn file(&self, file_id: FileId) -> Option<StoredFile> {
        self.state().files.iter().find(|f| f.id == file_id).cloned()
    }

    pub fn lineage(&self) -> Vec<LineageEdge> {
        self.state().lineage.clone()
    }

    pub fn session_calls(&self) -> Vec<SessionCall> {
        self.state().sessions.clone()
    }

    /// Number of `end_session` calls made for `session_id`.
    pub fn end_calls(&self, session_id: SessionId) -> usize {
        self.state()
            .sessions
            .iter()
            .filter(|call| matches!(call, SessionCall::Ended { session_id: id, .. } if *id == session_id))
            .count()
    }

    pub fn queue_status(&self, file_id: FileId, action: &str) -> Option<ActionStatus> {
        self.state()
            .statuses
            .get(&(file_id, action.to_string()))
            .copied()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn insert(&mut self, request: &RegisterRequest) -> FileId {
        self.next_file_id += 1;
        let id = FileId(self.next_file_id);
        self.by_path.insert(request.path.clone(), id);
        self.files.push(StoredFile {
            id,
            path: request.path.clone(),
            size: request.size,
            pages: request.pages,
            priority: request.priority,
            workflow_id: request.workflow_id,
        });
        id
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn start_session(
        &self,
        kind: TaskKind,
        source_id: FileId,
        action_id: Option<ActionId>,
    ) -> Result<SessionId> {
        if self.faults.session_start {
            return Err(PipelineError::CatalogUnavailable(
                "session start rejected".into(),
            ));
        }

        let session_id = SessionId(Uuid::new_v4());
        self.state().sessions.push(SessionCall::Started {
            session_id,
            kind,
            source_id,
            action_id,
        });
        Ok(session_id)
    }

    async fn end_session(&self, session_id: SessionId, success: bool) -> Result<()> {
        let mut state = self.state();
        let known = state.sessions.iter().any(
            |call| matches!(call, SessionCall::Started { session_id: id, .. } if *id == session_id),
        );
        if !known {
            return Err(PipelineError::SessionNotFound(session_id));
        }

        state.sessions.push(SessionCall::Ended {
            session_id,
            success,
        });
        if self.faults.session_end {
            return Err(PipelineError::CatalogUnavailable("session end rejected".into()));
        }
        Ok(())
    }

    async fn register_file(&self, request: &RegisterRequest) -> RegisterOutcome {
        let mut state = self.state();

        if let Some(limit) = self.faults.registration_after {
            if state.registrations >= limit {
                return RegisterOutcome::Failed(PipelineError::CatalogUnavailable(
                    "registration rejected".into(),
                ));
            }
        }

        if state.by_path.contains_key(&request.path) {
            if self.faults.collisions_as_failures {
                return RegisterOutcome::Failed(PipelineError::CatalogUnavailable(format!(
                    "insert failed for {}",
                    request.path.display()
                )));
            }
            return RegisterOutcome::NameCollision;
        }

        state.registrations += 1;
        RegisterOutcome::Registered(state.insert(request))
    }

    async fn find_file_by_path(&self, path: &Path) -> Result<Option<FileId>> {
        if self.faults.lookup {
            return Err(PipelineError::CatalogUnavailable("lookup rejected".into()));
        }
        Ok(self.state().by_path.get(path).copied())
    }

    async fn record_lineage(&self, edge: &LineageEdge) -> Result<()> {
        if self.faults.lineage {
            return Err(PipelineError::CatalogUnavailable(
                "lineage write rejected".into(),
            ));
        }
        self.state().lineage.push(edge.clone());
        Ok(())
    }

    async fn set_queue_status(
        &self,
        file_id: FileId,
        action: &str,
        status: ActionStatus,
        _workflow_id: Option<WorkflowId>,
        override_processing: bool,
    ) -> Result<bool> {
        if let Some(known) = &self.known_actions {
            if !known.contains(action) {
                return Err(PipelineError::ActionNotFound(action.to_string()));
            }
        }

        let mut state = self.state();
        if !state.files.iter().any(|f| f.id == file_id) {
            return Err(PipelineError::FileNotFound(file_id));
        }

        let key = (file_id, action.to_string());
        if !override_processing && state.statuses.get(&key) == Some(&ActionStatus::Processing) {
            return Ok(false);
        }
        state.statuses.insert(key, status);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_duplicate_path_is_a_collision() {
        let catalog = MemoryCatalog::new();
        let request = RegisterRequest::new("/out/a.pdf", 10).with_pages(2);

        let first = catalog.register_file(&request).await;
        assert!(matches!(first, RegisterOutcome::Registered(FileId(1))));

        let second = catalog.register_file(&request).await;
        assert!(matches!(second, RegisterOutcome::NameCollision));

        let files = catalog.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].pages, 2);
    }

    #[tokio::test]
    async fn test_collisions_as_failures() {
        let catalog = MemoryCatalog::new().with_collisions_as_failures();
        catalog.insert_existing("/out/a.pdf");

        let outcome = catalog
            .register_file(&RegisterRequest::new("/out/a.pdf", 1))
            .await;
        assert!(matches!(outcome, RegisterOutcome::Failed(_)));
        assert_eq!(
            catalog.find_file_by_path(Path::new("/out/a.pdf")).await.unwrap(),
            Some(FileId(1))
        );
    }

    #[tokio::test]
    async fn test_failing_registration_after_successes() {
        let catalog = MemoryCatalog::new().with_failing_registration_after(1);

        let first = catalog.register_file(&RegisterRequest::new("/out/a", 1)).await;
        assert!(matches!(first, RegisterOutcome::Registered(_)));

        let second = catalog.register_file(&RegisterRequest::new("/out/b", 1)).await;
        assert!(matches!(second, RegisterOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_session_calls_are_recorded() {
        let catalog = MemoryCatalog::new();
        let session_id = catalog
            .start_session(TaskKind::MimeSplit, FileId(9), Some(ActionId(1)))
            .await
            .unwrap();
        catalog.end_session(session_id, true).await.unwrap();

        assert_eq!(catalog.end_calls(session_id), 1);
        assert_eq!(
            catalog.session_calls()[1],
            SessionCall::Ended {
                session_id,
                success: true
            }
        );
    }

    #[tokio::test]
    async fn test_end_unknown_session() {
        let catalog = MemoryCatalog::new();
        let result = catalog.end_session(SessionId(Uuid::new_v4()), true).await;
        assert!(matches!(result, Err(PipelineError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_queue_status_respects_processing() {
        let catalog = MemoryCatalog::new();
        let id = catalog.insert_existing("/in/msg.eml");

        let set = |status, force| catalog.set_queue_status(id, "ocr", status, None, force);

        assert!(set(ActionStatus::Processing, false).await.unwrap());
        assert!(!set(ActionStatus::Pending, false).await.unwrap());
        assert_eq!(catalog.queue_status(id, "ocr"), Some(ActionStatus::Processing));

        assert!(set(ActionStatus::Pending, true).await.unwrap());
        assert_eq!(catalog.queue_status(id, "ocr"), Some(ActionStatus::Pending));
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let catalog = MemoryCatalog::new().with_known_actions(["ocr"]);
        let id = catalog.insert_existing("/in/msg.eml");

        let result = catalog
            .set_queue_status(id, "archive", ActionStatus::Pending, None, false)
            .await;
        assert!(matches!(result, Err(PipelineError::ActionNotFound(name)) if name == "archive"));
    }
}
