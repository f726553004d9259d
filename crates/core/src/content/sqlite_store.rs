//! SQLite-backed content store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    BookDraft, Chapter, ContentError, ContentStore, CreateDocumentRequest, CreateDraftRequest,
    CreateProjectRequest, Document, DocumentStatus, DocumentUpdate, DraftStatus, Project,
    ProjectStage,
};

const PROJECT_COLUMNS: &str = "id, name, description, current_stage, settings, created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, project_id, filename, format, file_path, status, \
     parsed_content, sanitized_content, analysis, rewritten_content, created_at, updated_at";
const DRAFT_COLUMNS: &str = "id, project_id, language, version, title, subtitle, author, \
     description, table_of_contents, chapters, front_matter, back_matter, status, is_primary, \
     approved_at, created_at, updated_at";

/// SQLite-backed content store.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Create a new SQLite content store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, ContentError> {
        let conn = Connection::open(path).map_err(|e| ContentError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite content store (useful for testing).
    pub fn in_memory() -> Result<Self, ContentError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ContentError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ContentError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                current_stage TEXT NOT NULL,
                settings TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                format TEXT NOT NULL,
                file_path TEXT NOT NULL,
                status TEXT NOT NULL,
                parsed_content TEXT,
                sanitized_content TEXT,
                analysis TEXT,
                rewritten_content TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS drafts (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                language TEXT NOT NULL,
                version INTEGER NOT NULL,
                title TEXT NOT NULL,
                subtitle TEXT,
                author TEXT,
                description TEXT,
                table_of_contents TEXT,
                chapters TEXT NOT NULL,
                front_matter TEXT,
                back_matter TEXT,
                status TEXT NOT NULL,
                is_primary INTEGER NOT NULL DEFAULT 0,
                approved_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_project_id ON documents(project_id);
            CREATE INDEX IF NOT EXISTS idx_drafts_project_id ON drafts(project_id);
            "#,
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(())
    }

    fn parse_ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let description: Option<String> = row.get(2)?;
        let stage_str: String = row.get(3)?;
        let settings_json: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        let current_stage = ProjectStage::parse_str(&stage_str).unwrap_or(ProjectStage::Upload);
        let settings = settings_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(Project {
            id,
            name,
            description,
            current_stage,
            settings,
            created_at: Self::parse_ts(&created_at_str),
            updated_at: Self::parse_ts(&updated_at_str),
        })
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
        let id: String = row.get(0)?;
        let project_id: String = row.get(1)?;
        let filename: String = row.get(2)?;
        let format: String = row.get(3)?;
        let file_path: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let parsed_json: Option<String> = row.get(6)?;
        let sanitized_content: Option<String> = row.get(7)?;
        let analysis_json: Option<String> = row.get(8)?;
        let rewritten_content: Option<String> = row.get(9)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;

        let status = DocumentStatus::parse_str(&status_str).unwrap_or(DocumentStatus::Uploaded);
        let parsed_content = parsed_json.and_then(|json| serde_json::from_str(&json).ok());
        let analysis = analysis_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(Document {
            id,
            project_id,
            filename,
            format,
            file_path,
            status,
            parsed_content,
            sanitized_content,
            analysis,
            rewritten_content,
            created_at: Self::parse_ts(&created_at_str),
            updated_at: Self::parse_ts(&updated_at_str),
        })
    }

    fn row_to_draft(row: &rusqlite::Row) -> rusqlite::Result<BookDraft> {
        let id: String = row.get(0)?;
        let project_id: String = row.get(1)?;
        let language: String = row.get(2)?;
        let version: u32 = row.get(3)?;
        let title: String = row.get(4)?;
        let subtitle: Option<String> = row.get(5)?;
        let author: Option<String> = row.get(6)?;
        let description: Option<String> = row.get(7)?;
        let toc_json: Option<String> = row.get(8)?;
        let chapters_json: String = row.get(9)?;
        let front_matter_json: Option<String> = row.get(10)?;
        let back_matter_json: Option<String> = row.get(11)?;
        let status_str: String = row.get(12)?;
        let is_primary: bool = row.get(13)?;
        let approved_at_str: Option<String> = row.get(14)?;
        let created_at_str: String = row.get(15)?;
        let updated_at_str: String = row.get(16)?;

        let status = DraftStatus::parse_str(&status_str).unwrap_or(DraftStatus::Draft);
        let chapters: Vec<Chapter> = serde_json::from_str(&chapters_json).unwrap_or_default();
        let table_of_contents = toc_json.and_then(|json| serde_json::from_str(&json).ok());
        let front_matter = front_matter_json.and_then(|json| serde_json::from_str(&json).ok());
        let back_matter = back_matter_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(BookDraft {
            id,
            project_id,
            language,
            version,
            title,
            subtitle,
            author,
            description,
            table_of_contents,
            chapters,
            front_matter,
            back_matter,
            status,
            is_primary,
            approved_at: approved_at_str.as_deref().map(Self::parse_ts),
            created_at: Self::parse_ts(&created_at_str),
            updated_at: Self::parse_ts(&updated_at_str),
        })
    }

    fn get_project_locked(conn: &Connection, id: &str) -> Result<Project, ContentError> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_project) {
            Ok(project) => Ok(project),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(ContentError::ProjectNotFound(id.to_string()))
            }
            Err(e) => Err(ContentError::Database(e.to_string())),
        }
    }

    fn get_draft_locked(conn: &Connection, id: &str) -> Result<BookDraft, ContentError> {
        let sql = format!("SELECT {} FROM drafts WHERE id = ?", DRAFT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_draft) {
            Ok(draft) => Ok(draft),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(ContentError::DraftNotFound(id.to_string()))
            }
            Err(e) => Err(ContentError::Database(e.to_string())),
        }
    }
}

impl ContentStore for SqliteContentStore {
    fn create_project(&self, request: CreateProjectRequest) -> Result<Project, ContentError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let settings_json = request
            .settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ContentError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO projects (id, name, description, current_stage, settings, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.name,
                request.description,
                ProjectStage::Upload.as_str(),
                settings_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(Project {
            id,
            name: request.name,
            description: request.description,
            current_stage: ProjectStage::Upload,
            settings: request.settings,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>, ContentError> {
        let conn = self.conn.lock().unwrap();
        match Self::get_project_locked(&conn, id) {
            Ok(project) => Ok(Some(project)),
            Err(ContentError::ProjectNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, ContentError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM projects ORDER BY created_at DESC LIMIT ? OFFSET ?",
            PROJECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit, offset], Self::row_to_project)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let mut projects = Vec::new();
        for row_result in rows {
            projects.push(row_result.map_err(|e| ContentError::Database(e.to_string()))?);
        }
        Ok(projects)
    }

    fn set_project_stage(&self, id: &str, stage: ProjectStage) -> Result<Project, ContentError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_project_locked(&conn, id)?;
        let now = Utc::now();

        conn.execute(
            "UPDATE projects SET current_stage = ?, updated_at = ? WHERE id = ?",
            params![stage.as_str(), now.to_rfc3339(), id],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(Project {
            current_stage: stage,
            updated_at: now,
            ..current
        })
    }

    fn delete_project(&self, id: &str) -> Result<Project, ContentError> {
        let conn = self.conn.lock().unwrap();

        let project = Self::get_project_locked(&conn, id)?;

        conn.execute("DELETE FROM documents WHERE project_id = ?", params![id])
            .map_err(|e| ContentError::Database(e.to_string()))?;
        conn.execute("DELETE FROM drafts WHERE project_id = ?", params![id])
            .map_err(|e| ContentError::Database(e.to_string()))?;
        conn.execute("DELETE FROM projects WHERE id = ?", params![id])
            .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(project)
    }

    fn create_document(&self, request: CreateDocumentRequest) -> Result<Document, ContentError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO documents (id, project_id, filename, format, file_path, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.project_id,
                request.filename,
                request.format,
                request.file_path,
                DocumentStatus::Uploaded.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(Document {
            id,
            project_id: request.project_id,
            filename: request.filename,
            format: request.format,
            file_path: request.file_path,
            status: DocumentStatus::Uploaded,
            parsed_content: None,
            sanitized_content: None,
            analysis: None,
            rewritten_content: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>, ContentError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_document) {
            Ok(document) => Ok(Some(document)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ContentError::Database(e.to_string())),
        }
    }

    fn list_documents(&self, project_id: &str) -> Result<Vec<Document>, ContentError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM documents WHERE project_id = ? ORDER BY created_at ASC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![project_id], Self::row_to_document)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let mut documents = Vec::new();
        for row_result in rows {
            documents.push(row_result.map_err(|e| ContentError::Database(e.to_string()))?);
        }
        Ok(documents)
    }

    fn update_document(&self, id: &str, update: DocumentUpdate) -> Result<Document, ContentError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now();
        let status = update.status();

        let changed = match &update {
            DocumentUpdate::Parsed(content) => {
                let json = serde_json::to_string(content)
                    .map_err(|e| ContentError::Database(e.to_string()))?;
                conn.execute(
                    "UPDATE documents SET status = ?, parsed_content = ?, updated_at = ? WHERE id = ?",
                    params![status.as_str(), json, now.to_rfc3339(), id],
                )
            }
            DocumentUpdate::Sanitized(text) => conn.execute(
                "UPDATE documents SET status = ?, sanitized_content = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), text, now.to_rfc3339(), id],
            ),
            DocumentUpdate::Analyzed(analysis) => {
                let json = serde_json::to_string(analysis)
                    .map_err(|e| ContentError::Database(e.to_string()))?;
                conn.execute(
                    "UPDATE documents SET status = ?, analysis = ?, updated_at = ? WHERE id = ?",
                    params![status.as_str(), json, now.to_rfc3339(), id],
                )
            }
            DocumentUpdate::Rewritten(text) => conn.execute(
                "UPDATE documents SET status = ?, rewritten_content = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), text, now.to_rfc3339(), id],
            ),
            DocumentUpdate::ParseFailed | DocumentUpdate::RewriteFailed => conn.execute(
                "UPDATE documents SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), now.to_rfc3339(), id],
            ),
        }
        .map_err(|e| ContentError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(ContentError::DocumentNotFound(id.to_string()));
        }

        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        conn.query_row(&sql, params![id], Self::row_to_document)
            .map_err(|e| ContentError::Database(e.to_string()))
    }

    fn create_draft(&self, request: CreateDraftRequest) -> Result<BookDraft, ContentError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let version: u32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM drafts WHERE project_id = ? AND language = ?",
                params![request.project_id, request.language],
                |row| row.get(0),
            )
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let chapters_json = serde_json::to_string(&request.chapters)
            .map_err(|e| ContentError::Database(e.to_string()))?;
        let to_json = |v: &Option<serde_json::Value>| {
            v.as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| ContentError::Database(e.to_string()))
        };
        let toc_json = to_json(&request.table_of_contents)?;
        let front_json = to_json(&request.front_matter)?;
        let back_json = to_json(&request.back_matter)?;

        conn.execute(
            "INSERT INTO drafts (id, project_id, language, version, title, subtitle, author, \
             description, table_of_contents, chapters, front_matter, back_matter, status, \
             is_primary, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.project_id,
                request.language,
                version,
                request.title,
                request.subtitle,
                request.author,
                request.description,
                toc_json,
                chapters_json,
                front_json,
                back_json,
                DraftStatus::Draft.as_str(),
                request.is_primary,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(BookDraft {
            id,
            project_id: request.project_id,
            language: request.language,
            version,
            title: request.title,
            subtitle: request.subtitle,
            author: request.author,
            description: request.description,
            table_of_contents: request.table_of_contents,
            chapters: request.chapters,
            front_matter: request.front_matter,
            back_matter: request.back_matter,
            status: DraftStatus::Draft,
            is_primary: request.is_primary,
            approved_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_draft(&self, id: &str) -> Result<Option<BookDraft>, ContentError> {
        let conn = self.conn.lock().unwrap();
        match Self::get_draft_locked(&conn, id) {
            Ok(draft) => Ok(Some(draft)),
            Err(ContentError::DraftNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_drafts(&self, project_id: &str) -> Result<Vec<BookDraft>, ContentError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM drafts WHERE project_id = ? ORDER BY created_at ASC",
            DRAFT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![project_id], Self::row_to_draft)
            .map_err(|e| ContentError::Database(e.to_string()))?;

        let mut drafts = Vec::new();
        for row_result in rows {
            drafts.push(row_result.map_err(|e| ContentError::Database(e.to_string()))?);
        }
        Ok(drafts)
    }

    fn primary_draft(&self, project_id: &str) -> Result<Option<BookDraft>, ContentError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM drafts WHERE project_id = ? AND is_primary = 1 \
             ORDER BY version DESC LIMIT 1",
            DRAFT_COLUMNS
        );
        match conn.query_row(&sql, params![project_id], Self::row_to_draft) {
            Ok(draft) => Ok(Some(draft)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ContentError::Database(e.to_string())),
        }
    }

    fn update_draft_chapters(
        &self,
        id: &str,
        chapters: Vec<Chapter>,
    ) -> Result<BookDraft, ContentError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_draft_locked(&conn, id)?;
        let now = Utc::now();

        let chapters_json =
            serde_json::to_string(&chapters).map_err(|e| ContentError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE drafts SET chapters = ?, updated_at = ? WHERE id = ?",
            params![chapters_json, now.to_rfc3339(), id],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(BookDraft {
            chapters,
            updated_at: now,
            ..current
        })
    }

    fn set_draft_status(&self, id: &str, status: DraftStatus) -> Result<BookDraft, ContentError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_draft_locked(&conn, id)?;
        let now = Utc::now();

        let approved_at = if status == DraftStatus::Approved {
            Some(now)
        } else {
            current.approved_at
        };

        conn.execute(
            "UPDATE drafts SET status = ?, approved_at = ?, updated_at = ? WHERE id = ?",
            params![
                status.as_str(),
                approved_at.map(|t| t.to_rfc3339()),
                now.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(BookDraft {
            status,
            approved_at,
            updated_at: now,
            ..current
        })
    }

    fn delete_draft(&self, id: &str) -> Result<BookDraft, ContentError> {
        let conn = self.conn.lock().unwrap();

        let draft = Self::get_draft_locked(&conn, id)?;

        conn.execute("DELETE FROM drafts WHERE id = ?", params![id])
            .map_err(|e| ContentError::Database(e.to_string()))?;

        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteContentStore {
        SqliteContentStore::in_memory().unwrap()
    }

    fn seed_project(store: &SqliteContentStore) -> Project {
        store
            .create_project(CreateProjectRequest::new("My Book"))
            .unwrap()
    }

    fn seed_document(store: &SqliteContentStore, project_id: &str) -> Document {
        store
            .create_document(CreateDocumentRequest {
                project_id: project_id.to_string(),
                filename: "chapter1.md".to_string(),
                format: "md".to_string(),
                file_path: "/uploads/chapter1.md".to_string(),
            })
            .unwrap()
    }

    fn draft_request(project_id: &str) -> CreateDraftRequest {
        CreateDraftRequest {
            project_id: project_id.to_string(),
            language: "en".to_string(),
            title: "My Book".to_string(),
            subtitle: None,
            author: Some("Anon".to_string()),
            description: None,
            table_of_contents: None,
            chapters: vec![Chapter {
                title: "Intro".to_string(),
                content: "Hello".to_string(),
                source_document_id: None,
            }],
            front_matter: None,
            back_matter: None,
            is_primary: true,
        }
    }

    #[test]
    fn test_create_project_starts_in_upload() {
        let store = create_test_store();
        let project = seed_project(&store);

        assert_eq!(project.current_stage, ProjectStage::Upload);
        let fetched = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(fetched.name, "My Book");
    }

    #[test]
    fn test_set_project_stage() {
        let store = create_test_store();
        let project = seed_project(&store);

        let updated = store
            .set_project_stage(&project.id, ProjectStage::Parse)
            .unwrap();
        assert_eq!(updated.current_stage, ProjectStage::Parse);

        let fetched = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(fetched.current_stage, ProjectStage::Parse);
    }

    #[test]
    fn test_set_stage_unknown_project() {
        let store = create_test_store();
        let result = store.set_project_stage("nope", ProjectStage::Parse);
        assert!(matches!(result, Err(ContentError::ProjectNotFound(_))));
    }

    #[test]
    fn test_list_projects() {
        let store = create_test_store();
        seed_project(&store);
        seed_project(&store);

        let projects = store.list_projects(100, 0).unwrap();
        assert_eq!(projects.len(), 2);
    }

    #[test]
    fn test_delete_project_cascades() {
        let store = create_test_store();
        let project = seed_project(&store);
        let document = seed_document(&store, &project.id);
        let draft = store.create_draft(draft_request(&project.id)).unwrap();

        store.delete_project(&project.id).unwrap();

        assert!(store.get_project(&project.id).unwrap().is_none());
        assert!(store.get_document(&document.id).unwrap().is_none());
        assert!(store.get_draft(&draft.id).unwrap().is_none());
    }

    #[test]
    fn test_document_stage_updates() {
        let store = create_test_store();
        let project = seed_project(&store);
        let document = seed_document(&store, &project.id);

        let parsed = store
            .update_document(
                &document.id,
                DocumentUpdate::Parsed(serde_json::json!({"blocks": []})),
            )
            .unwrap();
        assert_eq!(parsed.status, DocumentStatus::Parsed);
        assert!(parsed.parsed_content.is_some());

        let cleaned = store
            .update_document(
                &document.id,
                DocumentUpdate::Sanitized("clean text".to_string()),
            )
            .unwrap();
        assert_eq!(cleaned.status, DocumentStatus::Cleaned);
        assert_eq!(cleaned.sanitized_content.as_deref(), Some("clean text"));
        // Earlier stage output is preserved.
        assert!(cleaned.parsed_content.is_some());

        let analyzed = store
            .update_document(
                &document.id,
                DocumentUpdate::Analyzed(serde_json::json!({"chapters": 2})),
            )
            .unwrap();
        assert_eq!(analyzed.status, DocumentStatus::Analyzed);

        let rewritten = store
            .update_document(
                &document.id,
                DocumentUpdate::Rewritten("polished prose".to_string()),
            )
            .unwrap();
        assert_eq!(rewritten.status, DocumentStatus::Rewritten);
        assert_eq!(
            rewritten.rewritten_content.as_deref(),
            Some("polished prose")
        );
    }

    #[test]
    fn test_document_failure_statuses() {
        let store = create_test_store();
        let project = seed_project(&store);
        let document = seed_document(&store, &project.id);

        let failed = store
            .update_document(&document.id, DocumentUpdate::ParseFailed)
            .unwrap();
        assert_eq!(failed.status, DocumentStatus::ParseFailed);
        assert!(failed.parsed_content.is_none());
    }

    #[test]
    fn test_update_unknown_document() {
        let store = create_test_store();
        let result = store.update_document("nope", DocumentUpdate::ParseFailed);
        assert!(matches!(result, Err(ContentError::DocumentNotFound(_))));
    }

    #[test]
    fn test_draft_versions_increment_per_language() {
        let store = create_test_store();
        let project = seed_project(&store);

        let v1 = store.create_draft(draft_request(&project.id)).unwrap();
        let v2 = store.create_draft(draft_request(&project.id)).unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);

        let mut ja = draft_request(&project.id);
        ja.language = "ja".to_string();
        let ja_draft = store.create_draft(ja).unwrap();
        assert_eq!(ja_draft.version, 1);
    }

    #[test]
    fn test_primary_draft_lookup() {
        let store = create_test_store();
        let project = seed_project(&store);

        assert!(store.primary_draft(&project.id).unwrap().is_none());

        let mut secondary = draft_request(&project.id);
        secondary.is_primary = false;
        secondary.language = "ja".to_string();
        store.create_draft(secondary).unwrap();

        let primary = store.create_draft(draft_request(&project.id)).unwrap();
        let found = store.primary_draft(&project.id).unwrap().unwrap();
        assert_eq!(found.id, primary.id);
    }

    #[test]
    fn test_approve_draft_sets_timestamp() {
        let store = create_test_store();
        let project = seed_project(&store);
        let draft = store.create_draft(draft_request(&project.id)).unwrap();

        let approved = store
            .set_draft_status(&draft.id, DraftStatus::Approved)
            .unwrap();
        assert_eq!(approved.status, DraftStatus::Approved);
        assert!(approved.approved_at.is_some());

        let fetched = store.get_draft(&draft.id).unwrap().unwrap();
        assert_eq!(fetched.status, DraftStatus::Approved);
        assert!(fetched.approved_at.is_some());
    }

    #[test]
    fn test_update_draft_chapters() {
        let store = create_test_store();
        let project = seed_project(&store);
        let draft = store.create_draft(draft_request(&project.id)).unwrap();

        let rewritten = vec![Chapter {
            title: "Intro".to_string(),
            content: "Much better prose".to_string(),
            source_document_id: None,
        }];
        let updated = store
            .update_draft_chapters(&draft.id, rewritten.clone())
            .unwrap();
        assert_eq!(updated.chapters, rewritten);

        let fetched = store.get_draft(&draft.id).unwrap().unwrap();
        assert_eq!(fetched.chapters, rewritten);
    }

    #[test]
    fn test_delete_draft() {
        let store = create_test_store();
        let project = seed_project(&store);
        let draft = store.create_draft(draft_request(&project.id)).unwrap();

        store.delete_draft(&draft.id).unwrap();
        assert!(store.get_draft(&draft.id).unwrap().is_none());

        let result = store.delete_draft(&draft.id);
        assert!(matches!(result, Err(ContentError::DraftNotFound(_))));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("content.db");

        let store = SqliteContentStore::new(&db_path).unwrap();
        let project = store
            .create_project(CreateProjectRequest::new("Persisted"))
            .unwrap();

        assert!(db_path.exists());
        assert!(store.get_project(&project.id).unwrap().is_some());
    }
}
