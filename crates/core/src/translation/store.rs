use thiserror::Error;

use super::{TranslationJob, TranslationStatus};

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation job not found: {0}")]
    JobNotFound(String),

    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),

    #[error("Source draft not found: {0}")]
    SourceDraftNotFound(String),

    #[error("Source draft {0} is not approved")]
    SourceDraftNotApproved(String),

    #[error("Job {job_id} is {status}, cannot {operation}")]
    InvalidState {
        job_id: String,
        status: TranslationStatus,
        operation: &'static str,
    },

    #[error("Translation call failed: {0}")]
    Processor(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create one translation job.
#[derive(Debug, Clone)]
pub struct CreateTranslationJob {
    pub project_id: String,
    pub source_draft_id: String,
    pub target_language: String,
    pub provider: Option<String>,
    pub preserve_formatting: bool,
}

/// Filter for listing translation jobs.
#[derive(Debug, Clone, Default)]
pub struct TranslationFilter {
    pub project_id: Option<String>,
    pub source_draft_id: Option<String>,
    pub status: Option<TranslationStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl TranslationFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_source_draft_id(mut self, draft_id: impl Into<String>) -> Self {
        self.source_draft_id = Some(draft_id.into());
        self
    }

    pub fn with_status(mut self, status: TranslationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Storage backend for translation jobs.
pub trait TranslationStore: Send + Sync {
    /// Create a pending job.
    fn create(&self, request: CreateTranslationJob) -> Result<TranslationJob, TranslationError>;

    fn get(&self, id: &str) -> Result<Option<TranslationJob>, TranslationError>;

    /// Jobs matching the filter, newest first.
    fn list(&self, filter: &TranslationFilter) -> Result<Vec<TranslationJob>, TranslationError>;

    fn count(&self, filter: &TranslationFilter) -> Result<i64, TranslationError>;

    /// True if a non-terminal job already covers this
    /// (project, source draft, language) triple.
    fn has_active(
        &self,
        project_id: &str,
        source_draft_id: &str,
        target_language: &str,
    ) -> Result<bool, TranslationError>;

    /// Move a pending job to running, stamping `started_at`.
    fn mark_running(&self, id: &str) -> Result<TranslationJob, TranslationError>;

    fn set_progress(&self, id: &str, progress: u8) -> Result<TranslationJob, TranslationError>;

    /// Finish a running job successfully, linking the result draft.
    /// `degraded_units` counts the units the result carries in the source
    /// language because their translation call failed.
    fn complete(
        &self,
        id: &str,
        result_draft_id: &str,
        degraded_units: u32,
    ) -> Result<TranslationJob, TranslationError>;

    /// Finish a running job with an error. No result draft is linked.
    fn fail(&self, id: &str, error: &str) -> Result<TranslationJob, TranslationError>;

    /// Cancel a pending or running job.
    fn cancel(&self, id: &str) -> Result<TranslationJob, TranslationError>;

    /// Remove a job record. Refused while the job is running.
    fn delete(&self, id: &str) -> Result<TranslationJob, TranslationError>;

    fn delete_by_project(&self, project_id: &str) -> Result<usize, TranslationError>;
}
