//! Projects, documents and book drafts.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteContentStore;
pub use store::{
    ContentError, ContentStore, CreateDocumentRequest, CreateDraftRequest, CreateProjectRequest,
    DocumentUpdate,
};
pub use types::{
    BookDraft, Chapter, Document, DocumentStatus, DraftStatus, Project, ProjectStage,
};
