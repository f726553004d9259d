use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::content::{Chapter, ContentStore, CreateDraftRequest, DocumentStatus};
use crate::task::{StageKind, StageResult, Task};

use super::{HandlerOutcome, StageError, StageHandler, TaskHandle};

/// Assembles the analyzed documents into the project's primary book draft,
/// one chapter per document in upload order.
pub struct StructureHandler {
    content: Arc<dyn ContentStore>,
}

impl StructureHandler {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    fn setting_str(settings: Option<&serde_json::Value>, key: &str) -> Option<String> {
        settings?
            .get(key)
            .and_then(|value| value.as_str())
            .map(String::from)
    }
}

#[async_trait]
impl StageHandler for StructureHandler {
    fn stage(&self) -> StageKind {
        StageKind::Structure
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let project = self
            .content
            .get_project(&task.project_id)?
            .ok_or_else(|| StageError::Invalid(format!("unknown project {}", task.project_id)))?;

        // Re-runs reuse the draft a previous attempt already assembled.
        if let Some(existing) = self.content.primary_draft(&project.id)? {
            info!(project_id = %project.id, draft_id = %existing.id, "Primary draft already exists");
            handle.set_progress(100, "draft already assembled")?;
            return Ok(HandlerOutcome::Completed(StageResult::Structure {
                draft_id: existing.id,
                chapter_count: existing.chapters.len() as u32,
            }));
        }

        if handle.is_cancelled()? {
            return Ok(HandlerOutcome::Cancelled);
        }

        let documents = self.content.list_documents(&project.id)?;
        let mut chapters = Vec::new();

        for document in &documents {
            if document.status != DocumentStatus::Analyzed {
                continue;
            }

            let title = document
                .analysis
                .as_ref()
                .and_then(|analysis| analysis.get("title"))
                .and_then(|title| title.as_str())
                .unwrap_or(&document.filename)
                .to_string();
            let content = document.sanitized_content.clone().unwrap_or_default();

            chapters.push(Chapter {
                title,
                content,
                source_document_id: Some(document.id.clone()),
            });
        }

        let settings = project.settings.as_ref();
        let language =
            Self::setting_str(settings, "language").unwrap_or_else(|| "en".to_string());

        let draft = self.content.create_draft(CreateDraftRequest {
            project_id: project.id.clone(),
            language,
            title: project.name.clone(),
            subtitle: Self::setting_str(settings, "subtitle"),
            author: Self::setting_str(settings, "author"),
            description: project.description.clone(),
            table_of_contents: None,
            chapters,
            front_matter: None,
            back_matter: None,
            is_primary: true,
        })?;

        let chapter_count = draft.chapters.len() as u32;
        handle.set_progress(100, &format!("assembled {} chapters", chapter_count))?;
        info!(project_id = %project.id, draft_id = %draft.id, chapter_count, "Primary draft assembled");

        Ok(HandlerOutcome::Completed(StageResult::Structure {
            draft_id: draft.id,
            chapter_count,
        }))
    }
}
