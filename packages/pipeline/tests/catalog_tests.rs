mod common;

use std::path::Path;

use pretty_assertions::assert_eq;

use mailsplit_pipeline::action_queue::{self, AddFileRequest};
use mailsplit_pipeline::catalog::{Catalog, PgCatalog, RegisterOutcome};
use mailsplit_pipeline::models::{
    ActionStatus, FileId, LineageEdge, Priority, RegisterRequest, SessionId, TaskKind,
};
use mailsplit_pipeline::{HeuristicPageCounter, PipelineError, SplitConfig, Splitter};

#[tokio::test]
async fn test_register_and_find_by_path() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());

    let request = RegisterRequest::new("/out/msg001_body_text.html", 120)
        .with_pages(0)
        .with_priority(Priority::new(70));
    let RegisterOutcome::Registered(id) = catalog.register_file(&request).await else {
        panic!("expected registration to succeed");
    };

    let found = catalog
        .find_file_by_path(Path::new("/out/msg001_body_text.html"))
        .await
        .unwrap();
    assert_eq!(found, Some(id));

    let record = catalog.get_file(id).await.unwrap();
    assert_eq!(record.file_size, 120);
    assert_eq!(record.priority, 70);

    let missing = catalog
        .find_file_by_path(Path::new("/out/other.pdf"))
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_duplicate_path_is_a_name_collision() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());

    let request = RegisterRequest::new("/out/a.pdf", 10);
    assert!(matches!(
        catalog.register_file(&request).await,
        RegisterOutcome::Registered(_)
    ));
    assert!(matches!(
        catalog.register_file(&request).await,
        RegisterOutcome::NameCollision
    ));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());
    let action = action_queue::ensure_action(&db.pool, "split").await.unwrap();
    let source = action_queue::add_file(&db.pool, AddFileRequest::new("/in/msg001.eml", action))
        .await
        .unwrap();

    let session_id = catalog
        .start_session(TaskKind::MimeSplit, source.file_id, Some(action))
        .await
        .unwrap();

    let open = catalog.get_session(session_id).await.unwrap();
    assert_eq!(open.task_kind, "mime_split");
    assert_eq!(open.action_id, Some(action));
    assert!(open.ended_at.is_none());

    catalog.end_session(session_id, true).await.unwrap();
    let closed = catalog.get_session(session_id).await.unwrap();
    assert!(closed.ended_at.is_some());
    assert_eq!(closed.succeeded, Some(true));
}

#[tokio::test]
async fn test_end_unknown_session() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());

    let session_id = SessionId(uuid::Uuid::new_v4());
    let result = catalog.end_session(session_id, false).await;
    assert!(matches!(result, Err(PipelineError::SessionNotFound(id)) if id == session_id));
}

#[tokio::test]
async fn test_session_for_unknown_file_fails() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());

    let result = catalog
        .start_session(TaskKind::MimeSplit, FileId(424242), None)
        .await;
    assert!(matches!(result, Err(PipelineError::Database(_))));
}

#[tokio::test]
async fn test_record_lineage() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());
    let source = catalog.register_file(&RegisterRequest::new("/in/msg001.eml", 1)).await;
    let child = catalog.register_file(&RegisterRequest::new("/out/msg001_body_text.txt", 1)).await;
    let (RegisterOutcome::Registered(source), RegisterOutcome::Registered(child)) = (source, child)
    else {
        panic!("expected registrations to succeed");
    };

    let session_id = catalog
        .start_session(TaskKind::MimeSplit, source, None)
        .await
        .unwrap();
    let edge = LineageEdge::new(session_id, Path::new("/in/msg001.eml"), 1, child);
    catalog.record_lineage(&edge).await.unwrap();

    let edges = catalog.lineage_for(Path::new("/in/msg001.eml")).await.unwrap();
    assert_eq!(edges, vec![edge]);
}

#[tokio::test]
async fn test_set_queue_status_respects_processing() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());
    let ocr = action_queue::ensure_action(&db.pool, "ocr").await.unwrap();
    let queued = action_queue::add_file(&db.pool, AddFileRequest::new("/out/a.pdf", ocr))
        .await
        .unwrap();
    action_queue::claim_file(&db.pool, ocr).await.unwrap().unwrap();

    // Non-overriding request leaves a processing file alone
    let applied = catalog
        .set_queue_status(queued.file_id, "ocr", ActionStatus::Pending, None, false)
        .await
        .unwrap();
    assert!(!applied);
    let status = action_queue::get_status(&db.pool, queued.file_id, ocr).await.unwrap();
    assert_eq!(status.status, ActionStatus::Processing);

    // Overriding request takes it back to pending
    let applied = catalog
        .set_queue_status(queued.file_id, "ocr", ActionStatus::Pending, None, true)
        .await
        .unwrap();
    assert!(applied);
    let status = action_queue::get_status(&db.pool, queued.file_id, ocr).await.unwrap();
    assert_eq!(status.status, ActionStatus::Pending);
    assert_eq!(status.attempts, 0);
}

#[tokio::test]
async fn test_set_queue_status_creates_entry() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());
    let ocr = action_queue::ensure_action(&db.pool, "ocr").await.unwrap();
    let RegisterOutcome::Registered(id) = catalog
        .register_file(&RegisterRequest::new("/out/a.pdf", 1).with_priority(Priority::new(80)))
        .await
    else {
        panic!("expected registration to succeed");
    };

    assert!(catalog
        .set_queue_status(id, "ocr", ActionStatus::Pending, None, false)
        .await
        .unwrap());

    let claimed = action_queue::claim_file(&db.pool, ocr).await.unwrap().unwrap();
    assert_eq!(claimed.file_id, id);
    assert_eq!(claimed.priority, 80);
}

#[tokio::test]
async fn test_set_queue_status_unknown_action() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());

    let result = catalog
        .set_queue_status(FileId(1), "no-such-action", ActionStatus::Pending, None, false)
        .await;
    assert!(matches!(result, Err(PipelineError::ActionNotFound(_))));
}

#[tokio::test]
async fn test_split_against_postgres() {
    let db = common::TestDb::new().await;
    let catalog = PgCatalog::new(db.pool.clone());
    let workspace = common::Workspace::with_message("html_two_pdfs.eml", "msg001.eml");

    let split = action_queue::ensure_action(&db.pool, "split").await.unwrap();
    let ocr = action_queue::ensure_action(&db.pool, "ocr").await.unwrap();
    let archive = action_queue::ensure_action(&db.pool, "archive").await.unwrap();
    let queued = action_queue::add_file(&db.pool, AddFileRequest::new(&workspace.source, split))
        .await
        .unwrap();
    action_queue::claim_file(&db.pool, split).await.unwrap().unwrap();

    let config = SplitConfig::new()
        .with_output_dir(&workspace.out_dir)
        .with_output_queue("ocr")
        .with_source_queue("archive");
    let outcome = Splitter::new(&catalog, &HeuristicPageCounter, &config)
        .split(&queued.source_record())
        .await
        .unwrap();

    let pages: Vec<u32> = outcome.artifacts.iter().map(|a| a.pages).collect();
    assert_eq!(pages, vec![0, 1, 2]);

    let edges = catalog.lineage_for(&workspace.source).await.unwrap();
    let ordinals: Vec<i32> = edges.iter().map(|e| e.child_ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);

    let ocr_queue = action_queue::list_files(&db.pool, ocr, Some(ActionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(ocr_queue.len(), 3);

    let source_status = action_queue::get_status(&db.pool, queued.file_id, archive)
        .await
        .unwrap();
    assert_eq!(source_status.status, ActionStatus::Pending);

    let session = catalog.get_session(outcome.session_id).await.unwrap();
    assert_eq!(session.succeeded, Some(true));

    // The claim in the split action is untouched by the split itself
    let split_status = action_queue::get_status(&db.pool, queued.file_id, split)
        .await
        .unwrap();
    assert_eq!(split_status.status, ActionStatus::Processing);
}
