use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::content::{ContentStore, DocumentStatus, DocumentUpdate};
use crate::processor::{ParseRequest, ProcessorClient};
use crate::task::{StageKind, StageResult, Task};

use super::{unit_progress, HandlerOutcome, StageError, StageHandler, TaskHandle};

/// Extracts a normalized AST from every uploaded document.
pub struct ParseHandler {
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
}

impl ParseHandler {
    pub fn new(content: Arc<dyn ContentStore>, processor: Arc<dyn ProcessorClient>) -> Self {
        Self { content, processor }
    }
}

#[async_trait]
impl StageHandler for ParseHandler {
    fn stage(&self) -> StageKind {
        StageKind::Parse
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let documents = self.content.list_documents(&task.project_id)?;

        if documents.is_empty() {
            handle.set_progress(100, "no documents")?;
            return Ok(HandlerOutcome::Completed(StageResult::Parse {
                parsed: 0,
                failed: 0,
                skipped: 0,
            }));
        }

        let total = documents.len();
        let mut parsed = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;

        for (index, document) in documents.iter().enumerate() {
            if handle.is_cancelled()? {
                return Ok(HandlerOutcome::Cancelled);
            }

            // Re-runs skip documents a previous attempt already parsed.
            if !matches!(
                document.status,
                DocumentStatus::Uploaded | DocumentStatus::ParseFailed
            ) {
                skipped += 1;
            } else {
                let request = ParseRequest {
                    file_path: document.file_path.clone(),
                    format: document.format.clone(),
                    filename: document.filename.clone(),
                };

                match self.processor.parse(request).await {
                    Ok(response) => {
                        let content = serde_json::json!({
                            "ast": response.ast,
                            "metadata": response.metadata,
                        });
                        self.content
                            .update_document(&document.id, DocumentUpdate::Parsed(content))?;
                        parsed += 1;
                    }
                    Err(e) => {
                        warn!(
                            document_id = %document.id,
                            filename = %document.filename,
                            "Parse failed: {}", e
                        );
                        self.content
                            .update_document(&document.id, DocumentUpdate::ParseFailed)?;
                        failed += 1;
                    }
                }
            }

            let done = index + 1;
            handle.set_progress(
                unit_progress(done, total),
                &format!("parsed {}/{} documents", done, total),
            )?;
        }

        Ok(HandlerOutcome::Completed(StageResult::Parse {
            parsed,
            failed,
            skipped,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CreateDocumentRequest, CreateProjectRequest, SqliteContentStore};
    use crate::task::{CreateTaskRequest, SqliteTaskStore, TaskStatus, TaskStore};
    use crate::testing::MockProcessorClient;

    struct Fixture {
        handler: ParseHandler,
        content: Arc<SqliteContentStore>,
        processor: Arc<MockProcessorClient>,
        tasks: Arc<SqliteTaskStore>,
        project_id: String,
    }

    fn fixture() -> Fixture {
        let content = Arc::new(SqliteContentStore::in_memory().unwrap());
        let processor = Arc::new(MockProcessorClient::new());
        let tasks = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let project = content
            .create_project(CreateProjectRequest::new("book"))
            .unwrap();

        Fixture {
            handler: ParseHandler::new(content.clone(), processor.clone()),
            content,
            processor,
            tasks,
            project_id: project.id,
        }
    }

    impl Fixture {
        fn add_document(&self, filename: &str) -> String {
            self.content
                .create_document(CreateDocumentRequest {
                    project_id: self.project_id.clone(),
                    filename: filename.to_string(),
                    format: "md".to_string(),
                    file_path: format!("/uploads/{}", filename),
                })
                .unwrap()
                .id
        }

        fn running_task(&self) -> (Task, TaskHandle) {
            let task = self
                .tasks
                .create(CreateTaskRequest::new(
                    self.project_id.clone(),
                    StageKind::Parse,
                ))
                .unwrap();
            let task = self
                .tasks
                .update_status(&task.id, TaskStatus::Running)
                .unwrap();
            let handle = TaskHandle::new(task.id.clone(), self.tasks.clone());
            (task, handle)
        }
    }

    #[tokio::test]
    async fn test_empty_project_completes_immediately() {
        let f = fixture();
        let (task, handle) = f.running_task();

        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Parse {
            parsed,
            failed,
            skipped,
        }) = outcome
        else {
            panic!("expected parse result");
        };
        assert_eq!((parsed, failed, skipped), (0, 0, 0));

        let task = handle.current().unwrap();
        assert_eq!(task.progress, 100);
        assert_eq!(task.message.as_deref(), Some("no documents"));
    }

    #[tokio::test]
    async fn test_parses_all_documents() {
        let f = fixture();
        let a = f.add_document("a.md");
        f.add_document("b.md");
        let (task, handle) = f.running_task();

        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Parse { parsed, .. }) = outcome else {
            panic!("expected parse result");
        };
        assert_eq!(parsed, 2);

        let document = f.content.get_document(&a).unwrap().unwrap();
        assert_eq!(document.status, DocumentStatus::Parsed);
        assert!(document.parsed_content.is_some());
        assert_eq!(handle.current().unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_per_document_failure_continues() {
        let f = fixture();
        f.add_document("a.md");
        f.add_document("b.md");
        f.processor.fail_endpoint("parse");
        let (task, handle) = f.running_task();

        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Parse { parsed, failed, .. }) = outcome else {
            panic!("expected parse result");
        };
        assert_eq!(parsed, 0);
        assert_eq!(failed, 2);

        // Task still reaches 100% and completes; failures live in the result
        assert_eq!(handle.current().unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_rerun_skips_parsed_documents() {
        let f = fixture();
        f.add_document("a.md");
        f.add_document("b.md");
        let (task, handle) = f.running_task();
        f.handler.run(&task, &handle).await.unwrap();

        // Second run over the same documents
        let (task, handle) = f.running_task();
        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Parse {
            parsed, skipped, ..
        }) = outcome
        else {
            panic!("expected parse result");
        };
        assert_eq!(parsed, 0);
        assert_eq!(skipped, 2);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_documents() {
        let f = fixture();
        f.add_document("a.md");
        let (task, handle) = f.running_task();
        f.tasks
            .update_status(&task.id, TaskStatus::Cancelled)
            .unwrap();

        let outcome = f.handler.run(&task, &handle).await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Cancelled));
        assert!(f.processor.calls().is_empty());
    }
}
