use std::path::Path;

use crate::catalog::Catalog;
use crate::error::{PipelineError, Result};
use crate::models::{LineageEdge, OutputArtifact, SessionId};

/// Writes parent document to output file edges.
///
/// A failed write is fatal for the split: an output without lineage is an
/// orphan.
pub struct LineageRecorder<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    session_id: SessionId,
}

impl<'a, C: Catalog + ?Sized> LineageRecorder<'a, C> {
    pub fn new(catalog: &'a C, session_id: SessionId) -> Self {
        Self {
            catalog,
            session_id,
        }
    }

    pub async fn record(&self, parent: &Path, artifact: &OutputArtifact) -> Result<LineageEdge> {
        let edge = LineageEdge::new(self.session_id, parent, artifact.ordinal, artifact.id);

        self.catalog
            .record_lineage(&edge)
            .await
            .map_err(|e| PipelineError::Lineage {
                path: parent.to_path_buf(),
                ordinal: artifact.ordinal,
                source: Box::new(e),
            })?;

        tracing::debug!(
            session_id = %self.session_id,
            ordinal = artifact.ordinal,
            child = %artifact.id,
            "lineage recorded"
        );
        Ok(edge)
    }
}
