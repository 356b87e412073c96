//! Split an email message into registered output files.
//!
//! One call to [`Splitter::split`] opens a catalog session, decomposes the
//! source into its body and attachments, and for each part in order:
//! registers it under a unique name, records its lineage and queues it.
//! The source is then moved to its next queue and the session is closed.
//!
//! A fatal error stops the split. Parts already registered stay registered;
//! running the split again produces `_copy_NNN_` variants next to them.
//! The session is closed on every path once it was opened.

use std::path::PathBuf;

use mailsplit_mime::decompose;

use crate::catalog::Catalog;
use crate::config::SplitConfig;
use crate::dispatch::QueueDispatcher;
use crate::error::{PipelineError, Result};
use crate::lineage::LineageRecorder;
use crate::models::{SessionId, SourceRecord, SplitOutcome, TaskKind};
use crate::naming::OutputPathBuilder;
use crate::page_count::PageCounter;
use crate::registrar::Registrar;

pub struct Splitter<'a, C: Catalog + ?Sized, P: PageCounter + ?Sized> {
    catalog: &'a C,
    page_counter: &'a P,
    config: &'a SplitConfig,
}

impl<'a, C: Catalog + ?Sized, P: PageCounter + ?Sized> Splitter<'a, C, P> {
    pub fn new(catalog: &'a C, page_counter: &'a P, config: &'a SplitConfig) -> Self {
        Self {
            catalog,
            page_counter,
            config,
        }
    }

    #[tracing::instrument(skip_all, fields(source_id = %source.id, path = %source.path.display()))]
    pub async fn split(&self, source: &SourceRecord) -> Result<SplitOutcome> {
        let session_id = self
            .catalog
            .start_session(TaskKind::MimeSplit, source.id, source.action_id)
            .await
            .map_err(|e| PipelineError::SessionStart {
                source_id: source.id,
                source: Box::new(e),
            })?;

        let result = self.run(source, session_id).await;

        if let Err(e) = self.catalog.end_session(session_id, result.is_ok()).await {
            tracing::warn!(%session_id, error = %e, "failed to close session");
        }

        match &result {
            Ok(outcome) => tracing::info!(
                %session_id,
                outputs = outcome.artifacts.len(),
                "split completed"
            ),
            Err(e) => tracing::error!(%session_id, error = %e, "split aborted"),
        }
        result
    }

    async fn run(&self, source: &SourceRecord, session_id: SessionId) -> Result<SplitOutcome> {
        let raw = tokio::fs::read(&source.path)
            .await
            .map_err(|e| PipelineError::SourceRead {
                path: source.path.clone(),
                source: e,
            })?;

        let parts = decompose(&raw).map_err(|e| PipelineError::Decompose {
            path: source.path.clone(),
            source: e,
        })?;
        let body_format = parts.body_format();

        let paths = OutputPathBuilder::for_source(&source.path, self.config.output_dir.as_deref())?;
        let output_dir: PathBuf = paths.output_dir().to_path_buf();
        if !output_dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&output_dir)
                .await
                .map_err(|e| PipelineError::OutputWrite {
                    path: output_dir.clone(),
                    source: e,
                })?;
        }

        let registrar = Registrar::new(self.catalog, self.page_counter);
        let lineage = LineageRecorder::new(self.catalog, session_id);
        let dispatcher = QueueDispatcher::new(
            self.catalog,
            self.config.output_queue.as_deref(),
            self.config.source_queue.as_deref(),
        );

        tracing::debug!(parts = parts.len(), ?body_format, "message decomposed");

        let mut artifacts = Vec::with_capacity(parts.len());
        for part in parts {
            let target = paths.build(&part);
            let artifact = registrar.register(&part, &target, source).await?;
            lineage.record(&source.path, &artifact).await?;
            dispatcher
                .enqueue_output(artifact.id, source.workflow_id)
                .await;
            artifacts.push(artifact);
        }

        dispatcher
            .enqueue_source(source.id, source.workflow_id)
            .await;

        Ok(SplitOutcome {
            session_id,
            body_format,
            artifacts,
        })
    }
}
