//! Content storage trait and request types.

use crate::content::{
    BookDraft, Chapter, Document, DocumentStatus, DraftStatus, Project, ProjectStage,
};

/// Error type for content operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Draft not found: {0}")]
    DraftNotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new project.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub settings: Option<serde_json::Value>,
}

impl CreateProjectRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            settings: None,
        }
    }
}

/// Request to register an uploaded document.
#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub project_id: String,
    pub filename: String,
    pub format: String,
    pub file_path: String,
}

/// Request to create a book draft.
///
/// The store assigns the id and the next version number for the
/// (project, language) pair.
#[derive(Debug, Clone)]
pub struct CreateDraftRequest {
    pub project_id: String,
    pub language: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub table_of_contents: Option<serde_json::Value>,
    pub chapters: Vec<Chapter>,
    pub front_matter: Option<serde_json::Value>,
    pub back_matter: Option<serde_json::Value>,
    pub is_primary: bool,
}

/// Per-stage update applied to a document.
#[derive(Debug, Clone)]
pub enum DocumentUpdate {
    Parsed(serde_json::Value),
    ParseFailed,
    Sanitized(String),
    Analyzed(serde_json::Value),
    Rewritten(String),
    RewriteFailed,
}

impl DocumentUpdate {
    /// The document status this update lands the document in.
    pub fn status(&self) -> DocumentStatus {
        match self {
            DocumentUpdate::Parsed(_) => DocumentStatus::Parsed,
            DocumentUpdate::ParseFailed => DocumentStatus::ParseFailed,
            DocumentUpdate::Sanitized(_) => DocumentStatus::Cleaned,
            DocumentUpdate::Analyzed(_) => DocumentStatus::Analyzed,
            DocumentUpdate::Rewritten(_) => DocumentStatus::Rewritten,
            DocumentUpdate::RewriteFailed => DocumentStatus::RewriteFailed,
        }
    }
}

/// Trait for project/document/draft storage backends.
pub trait ContentStore: Send + Sync {
    // Projects

    fn create_project(&self, request: CreateProjectRequest) -> Result<Project, ContentError>;

    fn get_project(&self, id: &str) -> Result<Option<Project>, ContentError>;

    fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, ContentError>;

    /// Set the project's current pipeline stage.
    fn set_project_stage(&self, id: &str, stage: ProjectStage) -> Result<Project, ContentError>;

    /// Delete a project with its documents and drafts.
    fn delete_project(&self, id: &str) -> Result<Project, ContentError>;

    // Documents

    fn create_document(&self, request: CreateDocumentRequest) -> Result<Document, ContentError>;

    fn get_document(&self, id: &str) -> Result<Option<Document>, ContentError>;

    /// All documents of a project in upload order.
    fn list_documents(&self, project_id: &str) -> Result<Vec<Document>, ContentError>;

    /// Apply a stage's output to a document, moving its status along.
    fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<Document, ContentError>;

    // Drafts

    fn create_draft(&self, request: CreateDraftRequest) -> Result<BookDraft, ContentError>;

    fn get_draft(&self, id: &str) -> Result<Option<BookDraft>, ContentError>;

    fn list_drafts(&self, project_id: &str) -> Result<Vec<BookDraft>, ContentError>;

    /// The project's primary draft, if the structure stage has run.
    fn primary_draft(&self, project_id: &str) -> Result<Option<BookDraft>, ContentError>;

    /// Replace a draft's chapters (used by the create stage as it rewrites).
    fn update_draft_chapters(
        &self,
        id: &str,
        chapters: Vec<Chapter>,
    ) -> Result<BookDraft, ContentError>;

    /// Set a draft's review status. Approval also stamps `approved_at`.
    fn set_draft_status(&self, id: &str, status: DraftStatus) -> Result<BookDraft, ContentError>;

    fn delete_draft(&self, id: &str) -> Result<BookDraft, ContentError>;
}
