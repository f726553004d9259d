use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::content::{ContentStore, DraftStatus};
use crate::processor::{GenerateChapter, GenerateRequest, ProcessorClient};
use crate::task::{GeneratedFile, StageKind, StageResult, Task, ValidationSummary};

use super::{HandlerOutcome, StageError, StageHandler, TaskHandle};

const DEFAULT_FORMAT: &str = "epub";

/// Renders the approved draft into the final output format.
///
/// Generation has no per-unit fallback: a service failure fails the task,
/// and a retry produces the whole book again.
pub struct GenerateHandler {
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
}

impl GenerateHandler {
    pub fn new(content: Arc<dyn ContentStore>, processor: Arc<dyn ProcessorClient>) -> Self {
        Self { content, processor }
    }
}

#[async_trait]
impl StageHandler for GenerateHandler {
    fn stage(&self) -> StageKind {
        StageKind::Generate
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let project = self
            .content
            .get_project(&task.project_id)?
            .ok_or_else(|| StageError::Invalid(format!("unknown project {}", task.project_id)))?;

        let draft = self.content.primary_draft(&project.id)?.ok_or_else(|| {
            StageError::Invalid(format!("project {} has no primary draft", project.id))
        })?;
        if draft.status != DraftStatus::Approved {
            return Err(StageError::Invalid(format!(
                "draft {} is {}, not approved",
                draft.id, draft.status
            )));
        }

        if handle.is_cancelled()? {
            return Ok(HandlerOutcome::Cancelled);
        }

        let format = project
            .settings
            .as_ref()
            .and_then(|settings| settings.get("format"))
            .and_then(|format| format.as_str())
            .unwrap_or(DEFAULT_FORMAT)
            .to_string();

        let chapters = draft
            .chapters
            .iter()
            .map(|chapter| GenerateChapter {
                title: chapter.title.clone(),
                content: chapter.content.clone(),
            })
            .collect();

        let metadata = serde_json::json!({
            "title": draft.title,
            "subtitle": draft.subtitle,
            "author": draft.author,
            "language": draft.language,
            "description": draft.description,
        });

        handle.set_progress(10, &format!("rendering {}", format))?;

        let response = self
            .processor
            .generate(GenerateRequest {
                chapters,
                metadata,
                format: format.clone(),
            })
            .await
            .map_err(|e| StageError::Processor(e.to_string()))?;

        let files: Vec<GeneratedFile> = response
            .files
            .into_iter()
            .map(|file| GeneratedFile {
                filename: file.filename,
                format: file.format,
                size_bytes: file.size_bytes,
            })
            .collect();
        let validation = ValidationSummary {
            valid: response.validation.valid,
            issues: response.validation.issues,
        };

        handle.set_progress(100, &format!("generated {} file(s)", files.len()))?;
        info!(
            project_id = %project.id,
            draft_id = %draft.id,
            files = files.len(),
            valid = validation.valid,
            "Book generated"
        );

        Ok(HandlerOutcome::Completed(StageResult::Generate {
            files,
            validation,
        }))
    }
}
