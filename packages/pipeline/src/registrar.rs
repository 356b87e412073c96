//! Commit a part to a unique output path and register it in the catalog.
//!
//! The catalog has no "insert or fetch" primitive, so names are claimed by
//! trying them in order: the natural name, then `_copy_001_`, `_copy_002_`
//! and so on until the catalog accepts one. A file already on disk at a
//! candidate path is skipped without asking the catalog. The loop has no
//! upper bound.
//!
//! The part bytes are staged in a temporary file once and copied into
//! place only after the catalog has accepted the name.

use std::path::Path;

use mailsplit_mime::Part;
use tempfile::NamedTempFile;

use crate::catalog::{Catalog, RegisterOutcome};
use crate::error::{PipelineError, Result};
use crate::models::{OutputArtifact, RegisterRequest, SourceRecord};
use crate::naming::OutputPath;
use crate::page_count::PageCounter;

/// Extensions that never have a page count.
const UNPAGINATED_EXTENSIONS: &[&str] = &["txt", "rtf", "html"];

/// Log a warning after this many consecutive collisions for one part.
pub const COLLISION_LOG_INTERVAL: u32 = 100;

pub struct Registrar<'a, C: Catalog + ?Sized, P: PageCounter + ?Sized> {
    catalog: &'a C,
    page_counter: &'a P,
}

impl<'a, C: Catalog + ?Sized, P: PageCounter + ?Sized> Registrar<'a, C, P> {
    pub fn new(catalog: &'a C, page_counter: &'a P) -> Self {
        Self {
            catalog,
            page_counter,
        }
    }

    /// Write `part` to the first free candidate of `target` and register it.
    ///
    /// Name collisions are handled here and never returned. Any other
    /// registration failure is returned as [`PipelineError::Registration`].
    #[tracing::instrument(skip_all, fields(ordinal = part.ordinal, filename = %part.filename))]
    pub async fn register(
        &self,
        part: &Part,
        target: &OutputPath,
        source: &SourceRecord,
    ) -> Result<OutputArtifact> {
        let staged = self.stage(part, target).await?;
        let size = part.content.len() as u64;
        let pages = self.pages_for(target, staged.path()).await;

        let mut copy: u32 = 0;
        loop {
            let candidate = target.candidate(copy);

            if !path_is_free(&candidate).await? {
                tracing::debug!(path = %candidate.display(), copy, "output file exists, trying next name");
                copy = next_copy(copy);
                continue;
            }

            let request = RegisterRequest::new(&candidate, size)
                .with_pages(pages)
                .with_priority(source.priority)
                .with_workflow(source.workflow_id);

            match self.catalog.register_file(&request).await {
                RegisterOutcome::Registered(id) => {
                    tokio::fs::copy(staged.path(), &candidate)
                        .await
                        .map_err(|source| PipelineError::OutputWrite {
                            path: candidate.clone(),
                            source,
                        })?;

                    tracing::info!(file_id = %id, path = %candidate.display(), pages, copy, "output registered");
                    return Ok(OutputArtifact {
                        id,
                        path: candidate,
                        role: part.role,
                        size,
                        pages,
                        ordinal: lineage_ordinal(part)?,
                        copy,
                    });
                }
                RegisterOutcome::NameCollision => {}
                RegisterOutcome::Failed(err) => self.confirm_collision(&candidate, err).await?,
            }

            tracing::debug!(path = %candidate.display(), copy, "name already registered, trying next name");
            copy = next_copy(copy);
        }
    }

    /// Stage the part bytes in a private temporary file, removed on drop.
    async fn stage(&self, part: &Part, target: &OutputPath) -> Result<NamedTempFile> {
        let suffix = target
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let staged = tempfile::Builder::new()
            .prefix("mailsplit-")
            .suffix(&suffix)
            .tempfile()?;

        tokio::fs::write(staged.path(), &part.content)
            .await
            .map_err(|source| PipelineError::OutputWrite {
                path: staged.path().to_path_buf(),
                source,
            })?;

        Ok(staged)
    }

    async fn pages_for(&self, target: &OutputPath, staged: &Path) -> u32 {
        let unpaginated = target
            .extension()
            .is_some_and(|ext| UNPAGINATED_EXTENSIONS.contains(&ext.as_str()));
        if unpaginated {
            return 0;
        }

        match self.page_counter.count_pages(staged).await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(error = %e, filename = target.filename(), "page count failed, using 0");
                0
            }
        }
    }

    /// After an unclassified registration failure, check that the name was
    /// taken. If the catalog does not know the path the failure is fatal.
    async fn confirm_collision(&self, candidate: &Path, err: PipelineError) -> Result<()> {
        match self.catalog.find_file_by_path(candidate).await {
            Ok(Some(existing)) => {
                tracing::debug!(path = %candidate.display(), existing = %existing, error = %err, "registration failed on a taken name");
                Ok(())
            }
            Ok(None) => Err(PipelineError::Registration {
                path: candidate.to_path_buf(),
                source: Box::new(err),
            }),
            Err(lookup) => {
                tracing::warn!(path = %candidate.display(), error = %lookup, "lookup after failed registration also failed");
                Err(PipelineError::Registration {
                    path: candidate.to_path_buf(),
                    source: Box::new(err),
                })
            }
        }
    }
}

async fn path_is_free(candidate: &Path) -> Result<bool> {
    let exists = tokio::fs::try_exists(candidate)
        .await
        .map_err(|source| PipelineError::OutputWrite {
            path: candidate.to_path_buf(),
            source,
        })?;
    Ok(!exists)
}

fn next_copy(copy: u32) -> u32 {
    let next = copy.saturating_add(1);
    if collision_warning_due(next) {
        tracing::warn!(collisions = next, "output name keeps colliding");
    }
    next
}

fn collision_warning_due(collisions: u32) -> bool {
    collisions % COLLISION_LOG_INTERVAL == 0
}

/// Lineage ordinal of a part: the body is 1 and attachments follow.
fn lineage_ordinal(part: &Part) -> Result<i32> {
    i32::try_from(part.ordinal)
        .map_err(|_| PipelineError::InvalidInput(format!("part ordinal {} out of range", part.ordinal)))
}
