use sqlx::PgPool;
use tokio::signal::unix::{signal, SignalKind};

use crate::action_queue;
use crate::catalog::PgCatalog;
use crate::config::WorkerConfig;
use crate::db;
use crate::error::{PipelineError, Result};
use crate::models::ActionId;
use crate::page_count::HeuristicPageCounter;
use crate::splitter::Splitter;

/// Run the split worker loop.
///
/// Polls the configured action for pending source files and splits them.
/// Supports graceful shutdown via SIGTERM and SIGINT (ctrl+c).
/// Shutdown is checked between files; a split in progress always runs to completion.
pub async fn run_split_worker(config: WorkerConfig) -> Result<()> {
    let pipeline_config = config.pipeline_config();
    let pool = db::create_pool(&pipeline_config).await?;
    db::run_migrations(&pool).await?;

    let action_id = action_queue::ensure_action(&pool, &config.split_action).await?;
    let catalog = PgCatalog::new(pool.clone());

    tracing::info!(
        action = %config.split_action,
        %action_id,
        output_dir = ?config.split.output_dir,
        output_queue = ?config.split.output_queue,
        source_queue = ?config.split.source_queue,
        poll_interval = ?config.poll_interval,
        "starting split worker"
    );

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| PipelineError::Worker(format!("failed to register SIGTERM handler: {e}")))?;

    let mut current_interval = std::time::Duration::ZERO; // poll immediately on startup

    loop {
        // Check for shutdown signals between files
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received SIGINT, stopping worker");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, stopping worker");
                break;
            }
            _ = tokio::time::sleep(current_interval) => {}
        }

        // Split outside of select! so it is never cancelled halfway
        match process_next_file(&pool, &catalog, action_id, &config).await {
            Ok(true) => {
                current_interval = config.poll_interval;
            }
            Ok(false) => {
                current_interval = (current_interval * 2)
                    .max(config.poll_interval)
                    .min(config.max_poll_interval);
                tracing::debug!(next_poll = ?current_interval, "no files pending, backing off");
            }
            Err(e) => {
                tracing::error!(error = %e, "error processing file");
                current_interval = (current_interval * 2)
                    .max(config.poll_interval)
                    .min(config.max_poll_interval);
            }
        }
    }

    Ok(())
}

/// Split the next pending file of the action.
///
/// Returns `Ok(true)` if a file was processed, `Ok(false)` if none was pending.
async fn process_next_file(
    pool: &PgPool,
    catalog: &PgCatalog,
    action_id: ActionId,
    config: &WorkerConfig,
) -> Result<bool> {
    let queued = match action_queue::claim_file(pool, action_id).await? {
        Some(queued) => queued,
        None => return Ok(false),
    };

    let source = queued.source_record();
    let splitter = Splitter::new(catalog, &HeuristicPageCounter, &config.split);

    match splitter.split(&source).await {
        Ok(outcome) => {
            tracing::info!(
                file_id = %queued.file_id,
                session_id = %outcome.session_id,
                outputs = outcome.artifacts.len(),
                "split completed successfully"
            );
            if let Err(e) = action_queue::complete_file(pool, queued.file_id, action_id).await {
                // The source queue may have taken the file over already
                tracing::warn!(file_id = %queued.file_id, error = %e, "failed to mark file as completed");
            }
            Ok(true)
        }
        Err(e) => {
            tracing::error!(
                file_id = %queued.file_id,
                path = %queued.path,
                error = %e,
                "split failed"
            );
            action_queue::fail_file(pool, queued.file_id, action_id, &e.to_string()).await?;
            Ok(true)
        }
    }
}
