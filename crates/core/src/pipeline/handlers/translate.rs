use std::sync::Arc;

use async_trait::async_trait;

use crate::content::ContentStore;
use crate::task::{StageKind, StageResult, Task};
use crate::translation::{TranslationFilter, TranslationStatus, TranslationStore};

use super::{HandlerOutcome, StageError, StageHandler, TaskHandle};

/// Snapshot stage for the translation phase.
///
/// Translation jobs run outside the task queue, fanned out per language
/// by the coordinator. This handler only reports where they stand, so a
/// translate task never blocks a worker while translations are running.
pub struct TranslateHandler {
    content: Arc<dyn ContentStore>,
    translations: Arc<dyn TranslationStore>,
}

impl TranslateHandler {
    pub fn new(content: Arc<dyn ContentStore>, translations: Arc<dyn TranslationStore>) -> Self {
        Self {
            content,
            translations,
        }
    }
}

#[async_trait]
impl StageHandler for TranslateHandler {
    fn stage(&self) -> StageKind {
        StageKind::Translate
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let draft = self.content.primary_draft(&task.project_id)?.ok_or_else(|| {
            StageError::Invalid(format!("project {} has no primary draft", task.project_id))
        })?;

        let jobs = self
            .translations
            .list(&TranslationFilter::new().with_source_draft_id(&draft.id))?;

        let total = jobs.len() as u32;
        let mut completed = 0u32;
        let mut languages = Vec::new();

        for job in &jobs {
            if job.status == TranslationStatus::Completed {
                completed += 1;
                languages.push(job.target_language.clone());
            }
        }

        handle.set_progress(
            100,
            &format!("{}/{} translations completed", completed, total),
        )?;

        Ok(HandlerOutcome::Completed(StageResult::Translate {
            completed,
            total,
            languages,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        CreateDraftRequest, CreateProjectRequest, DraftStatus, SqliteContentStore,
    };
    use crate::task::{CreateTaskRequest, SqliteTaskStore, TaskStatus, TaskStore};
    use crate::translation::{CreateTranslationJob, SqliteTranslationStore};

    struct Fixture {
        handler: TranslateHandler,
        content: Arc<SqliteContentStore>,
        translations: Arc<SqliteTranslationStore>,
        tasks: Arc<SqliteTaskStore>,
        project_id: String,
    }

    fn fixture() -> Fixture {
        let content = Arc::new(SqliteContentStore::in_memory().unwrap());
        let translations = Arc::new(SqliteTranslationStore::in_memory().unwrap());
        let tasks = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let project = content
            .create_project(CreateProjectRequest::new("book"))
            .unwrap();

        Fixture {
            handler: TranslateHandler::new(content.clone(), translations.clone()),
            content,
            translations,
            tasks,
            project_id: project.id,
        }
    }

    impl Fixture {
        fn add_approved_draft(&self) -> String {
            let draft = self
                .content
                .create_draft(CreateDraftRequest {
                    project_id: self.project_id.clone(),
                    language: "en".to_string(),
                    title: "Book".to_string(),
                    subtitle: None,
                    author: None,
                    description: None,
                    table_of_contents: None,
                    chapters: Vec::new(),
                    front_matter: None,
                    back_matter: None,
                    is_primary: true,
                })
                .unwrap();
            self.content
                .set_draft_status(&draft.id, DraftStatus::Approved)
                .unwrap();
            draft.id
        }

        fn add_job(&self, draft_id: &str, language: &str, status: TranslationStatus) {
            let job = self
                .translations
                .create(CreateTranslationJob {
                    project_id: self.project_id.clone(),
                    source_draft_id: draft_id.to_string(),
                    target_language: language.to_string(),
                    provider: None,
                    preserve_formatting: true,
                })
                .unwrap();
            if status != TranslationStatus::Pending {
                self.translations.mark_running(&job.id).unwrap();
            }
            if status == TranslationStatus::Completed {
                self.translations.complete(&job.id, "result-draft", 0).unwrap();
            }
        }

        fn running_task(&self) -> (Task, TaskHandle) {
            let task = self
                .tasks
                .create(CreateTaskRequest::new(
                    self.project_id.clone(),
                    StageKind::Translate,
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
    async fn test_reports_translation_progress() {
        let f = fixture();
        let draft_id = f.add_approved_draft();
        f.add_job(&draft_id, "ja", TranslationStatus::Completed);
        f.add_job(&draft_id, "de", TranslationStatus::Running);
        let (task, handle) = f.running_task();

        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Translate {
            completed,
            total,
            languages,
        }) = outcome
        else {
            panic!("expected translate result");
        };
        assert_eq!((completed, total), (1, 2));
        assert_eq!(languages, vec!["ja".to_string()]);
    }

    #[tokio::test]
    async fn test_no_jobs_reports_empty_snapshot() {
        let f = fixture();
        f.add_approved_draft();
        let (task, handle) = f.running_task();

        let outcome = f.handler.run(&task, &handle).await.unwrap();

        let HandlerOutcome::Completed(StageResult::Translate { completed, total, .. }) = outcome
        else {
            panic!("expected translate result");
        };
        assert_eq!((completed, total), (0, 0));
    }

    #[tokio::test]
    async fn test_missing_primary_draft_is_fatal() {
        let f = fixture();
        let (task, handle) = f.running_task();

        let result = f.handler.run(&task, &handle).await;
        assert!(matches!(result, Err(StageError::Invalid(_))));
    }
}
