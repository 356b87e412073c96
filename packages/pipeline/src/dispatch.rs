use crate::catalog::Catalog;
use crate::models::{ActionStatus, FileId, WorkflowId};

/// What happened to one dispatch request. Failures are logged, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No queue configured.
    Skipped,
    Queued,
    /// The file is processing in that queue and was left alone.
    LeftProcessing,
    Failed,
}

/// Makes split output and the split source pending in their downstream queues.
pub struct QueueDispatcher<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    output_queue: Option<&'a str>,
    source_queue: Option<&'a str>,
}

impl<'a, C: Catalog + ?Sized> QueueDispatcher<'a, C> {
    pub fn new(catalog: &'a C, output_queue: Option<&'a str>, source_queue: Option<&'a str>) -> Self {
        Self {
            catalog,
            output_queue,
            source_queue,
        }
    }

    /// Queue an output file without disturbing it if it is already processing.
    pub async fn enqueue_output(
        &self,
        file_id: FileId,
        workflow_id: Option<WorkflowId>,
    ) -> DispatchOutcome {
        self.enqueue(self.output_queue, file_id, workflow_id, false)
            .await
    }

    /// Move the source file to its next queue, even if it is processing.
    pub async fn enqueue_source(
        &self,
        file_id: FileId,
        workflow_id: Option<WorkflowId>,
    ) -> DispatchOutcome {
        self.enqueue(self.source_queue, file_id, workflow_id, true)
            .await
    }

    async fn enqueue(
        &self,
        queue: Option<&str>,
        file_id: FileId,
        workflow_id: Option<WorkflowId>,
        override_processing: bool,
    ) -> DispatchOutcome {
        let Some(queue) = queue else {
            return DispatchOutcome::Skipped;
        };

        match self
            .catalog
            .set_queue_status(
                file_id,
                queue,
                ActionStatus::Pending,
                workflow_id,
                override_processing,
            )
            .await
        {
            Ok(true) => DispatchOutcome::Queued,
            Ok(false) => DispatchOutcome::LeftProcessing,
            Err(e) => {
                tracing::warn!(%file_id, queue, error = %e, "failed to queue file");
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_unconfigured_queues_are_skipped() {
        let catalog = MemoryCatalog::new();
        let id = catalog.insert_existing("/out/a.pdf");
        let dispatcher = QueueDispatcher::new(&catalog, None, None);

        assert_eq!(dispatcher.enqueue_output(id, None).await, DispatchOutcome::Skipped);
        assert_eq!(dispatcher.enqueue_source(id, None).await, DispatchOutcome::Skipped);
        assert_eq!(catalog.queue_status(id, "ocr"), None);
    }

    #[tokio::test]
    async fn test_output_does_not_override_processing() {
        let catalog = MemoryCatalog::new();
        let id = catalog.insert_existing("/out/a.pdf");
        catalog
            .set_queue_status(id, "ocr", ActionStatus::Processing, None, true)
            .await
            .unwrap();

        let dispatcher = QueueDispatcher::new(&catalog, Some("ocr"), Some("ocr"));
        assert_eq!(
            dispatcher.enqueue_output(id, None).await,
            DispatchOutcome::LeftProcessing
        );
        assert_eq!(catalog.queue_status(id, "ocr"), Some(ActionStatus::Processing));

        assert_eq!(dispatcher.enqueue_source(id, None).await, DispatchOutcome::Queued);
        assert_eq!(catalog.queue_status(id, "ocr"), Some(ActionStatus::Pending));
    }

    #[tokio::test]
    async fn test_unknown_queue_is_reported_not_fatal() {
        let catalog = MemoryCatalog::new().with_known_actions(["ocr"]);
        let id = catalog.insert_existing("/out/a.pdf");
        let dispatcher = QueueDispatcher::new(&catalog, Some("no-such-queue"), None);

        assert_eq!(dispatcher.enqueue_output(id, None).await, DispatchOutcome::Failed);
    }
}
