use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::content::{ContentStore, DocumentStatus, DocumentUpdate, DraftStatus};
use crate::processor::ProcessorClient;
use crate::task::{StageKind, StageResult, Task};

use super::{unit_progress, HandlerOutcome, StageError, StageHandler, TaskHandle};

const DEFAULT_STYLE: &str = "book";

/// Rewrites the primary draft's chapters into publishable prose.
///
/// A failed rewrite keeps the chapter's original text and is counted in
/// the result; the draft always comes out complete. When every chapter is
/// done the draft moves to reviewing for the manual gate.
pub struct CreateHandler {
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
}

impl CreateHandler {
    pub fn new(content: Arc<dyn ContentStore>, processor: Arc<dyn ProcessorClient>) -> Self {
        Self { content, processor }
    }
}

#[async_trait]
impl StageHandler for CreateHandler {
    fn stage(&self) -> StageKind {
        StageKind::Create
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let project = self
            .content
            .get_project(&task.project_id)?
            .ok_or_else(|| StageError::Invalid(format!("unknown project {}", task.project_id)))?;

        let draft = self.content.primary_draft(&project.id)?.ok_or_else(|| {
            StageError::Invalid(format!("project {} has no primary draft", project.id))
        })?;

        let style = project
            .settings
            .as_ref()
            .and_then(|settings| settings.get("style"))
            .and_then(|style| style.as_str())
            .unwrap_or(DEFAULT_STYLE)
            .to_string();

        let total = draft.chapters.len().max(1);
        let mut chapters = draft.chapters.clone();
        let mut rewritten = 0u32;
        let mut failed = 0u32;

        for (index, chapter) in chapters.iter_mut().enumerate() {
            if handle.is_cancelled()? {
                return Ok(HandlerOutcome::Cancelled);
            }

            // Re-runs skip chapters whose source document was already
            // rewritten by an earlier attempt.
            let source_document = match &chapter.source_document_id {
                Some(id) => self.content.get_document(id)?,
                None => None,
            };
            if source_document
                .as_ref()
                .is_some_and(|document| document.status == DocumentStatus::Rewritten)
            {
                handle.set_progress(
                    unit_progress(index + 1, total),
                    &format!("rewriting chapter {}/{}", index + 1, total),
                )?;
                continue;
            }

            match self
                .processor
                .rewrite(&chapter.content, &style, &draft.language)
                .await
            {
                Ok(text) => {
                    chapter.content = text.clone();
                    if let Some(document) = &source_document {
                        self.content
                            .update_document(&document.id, DocumentUpdate::Rewritten(text))?;
                    }
                    rewritten += 1;
                }
                Err(e) => {
                    // Keep the chapter's original text
                    warn!(chapter = %chapter.title, "Rewrite failed, keeping original: {}", e);
                    if let Some(document) = &source_document {
                        self.content
                            .update_document(&document.id, DocumentUpdate::RewriteFailed)?;
                    }
                    failed += 1;
                }
            }

            handle.set_progress(
                unit_progress(index + 1, total),
                &format!("rewriting chapter {}/{}", index + 1, total),
            )?;
        }

        let draft = self.content.update_draft_chapters(&draft.id, chapters)?;
        self.content
            .set_draft_status(&draft.id, DraftStatus::Reviewing)?;

        Ok(HandlerOutcome::Completed(StageResult::Create {
            rewritten,
            failed,
            draft_id: draft.id,
        }))
    }
}
