use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::content::{ContentStore, Document, DocumentStatus, DocumentUpdate};
use crate::processor::ProcessorClient;
use crate::task::{StageKind, StageResult, Task};

use super::{unit_progress, HandlerOutcome, StageError, StageHandler, TaskHandle};

/// Analyzes each cleaned document's structure (chapters, headings, key
/// points) via the processing service.
///
/// Unavailable service degrades to a minimal heuristic analysis so the
/// pipeline can keep moving; the result records the degraded mode.
pub struct UnderstandHandler {
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
}

impl UnderstandHandler {
    pub fn new(content: Arc<dyn ContentStore>, processor: Arc<dyn ProcessorClient>) -> Self {
        Self { content, processor }
    }

    fn document_ast(document: &Document) -> Option<serde_json::Value> {
        document
            .parsed_content
            .as_ref()
            .and_then(|parsed| parsed.get("ast"))
            .cloned()
    }

    /// Heuristic stand-in when the service is down: title from the
    /// filename, summary from the leading text.
    fn fallback_analysis(document: &Document) -> Option<serde_json::Value> {
        let text = document.sanitized_content.as_deref()?;
        let summary: String = text.chars().take(200).collect();
        Some(serde_json::json!({
            "title": document.filename,
            "summary": summary,
            "key_points": [],
            "degraded": true,
        }))
    }
}

#[async_trait]
impl StageHandler for UnderstandHandler {
    fn stage(&self) -> StageKind {
        StageKind::Understand
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let documents = self.content.list_documents(&task.project_id)?;
        let total = documents.len().max(1);

        let mut analyzed = 0u32;
        let mut failed = 0u32;
        let mut degraded = false;

        for (index, document) in documents.iter().enumerate() {
            if handle.is_cancelled()? {
                return Ok(HandlerOutcome::Cancelled);
            }

            if document.status == DocumentStatus::Cleaned {
                let analysis = match Self::document_ast(document) {
                    Some(ast) => match self.processor.analyze(ast).await {
                        Ok(analysis) => Some(analysis),
                        Err(e) => {
                            warn!(
                                document_id = %document.id,
                                "Analysis unavailable, using fallback: {}", e
                            );
                            degraded = true;
                            Self::fallback_analysis(document)
                        }
                    },
                    None => Self::fallback_analysis(document),
                };

                match analysis {
                    Some(analysis) => {
                        self.content
                            .update_document(&document.id, DocumentUpdate::Analyzed(analysis))?;
                        analyzed += 1;
                    }
                    None => {
                        warn!(document_id = %document.id, "Document has nothing to analyze");
                        failed += 1;
                    }
                }
            }

            let done = index + 1;
            handle.set_progress(
                unit_progress(done, total),
                &format!("analyzed {}/{} documents", done, documents.len()),
            )?;
        }

        if documents.is_empty() {
            handle.set_progress(100, "no documents")?;
        }

        Ok(HandlerOutcome::Completed(StageResult::Understand {
            analyzed,
            failed,
            degraded,
        }))
    }
}
