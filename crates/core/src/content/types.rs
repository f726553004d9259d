//! Project, document and draft data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a project is currently in.
///
/// Distinct from [`crate::task::StageKind`]: a project passes through two
/// extra states that no task executes, the initial `Upload` and the manual
/// `Review` gate between create and translate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStage {
    Upload,
    Parse,
    Clean,
    Understand,
    Structure,
    Create,
    Review,
    Translate,
    Generate,
    Completed,
}

impl ProjectStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStage::Upload => "upload",
            ProjectStage::Parse => "parse",
            ProjectStage::Clean => "clean",
            ProjectStage::Understand => "understand",
            ProjectStage::Structure => "structure",
            ProjectStage::Create => "create",
            ProjectStage::Review => "review",
            ProjectStage::Translate => "translate",
            ProjectStage::Generate => "generate",
            ProjectStage::Completed => "completed",
        }
    }

    pub fn parse_str(s: &str) -> Option<ProjectStage> {
        match s {
            "upload" => Some(ProjectStage::Upload),
            "parse" => Some(ProjectStage::Parse),
            "clean" => Some(ProjectStage::Clean),
            "understand" => Some(ProjectStage::Understand),
            "structure" => Some(ProjectStage::Structure),
            "create" => Some(ProjectStage::Create),
            "review" => Some(ProjectStage::Review),
            "translate" => Some(ProjectStage::Translate),
            "generate" => Some(ProjectStage::Generate),
            "completed" => Some(ProjectStage::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A book project owning documents, drafts and tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub current_stage: ProjectStage,
    /// Free-form per-project settings (style, target audience).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processing status of an uploaded document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Parsed,
    ParseFailed,
    Cleaned,
    Analyzed,
    Rewritten,
    RewriteFailed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Parsed => "parsed",
            DocumentStatus::ParseFailed => "parse_failed",
            DocumentStatus::Cleaned => "cleaned",
            DocumentStatus::Analyzed => "analyzed",
            DocumentStatus::Rewritten => "rewritten",
            DocumentStatus::RewriteFailed => "rewrite_failed",
        }
    }

    pub fn parse_str(s: &str) -> Option<DocumentStatus> {
        match s {
            "uploaded" => Some(DocumentStatus::Uploaded),
            "parsed" => Some(DocumentStatus::Parsed),
            "parse_failed" => Some(DocumentStatus::ParseFailed),
            "cleaned" => Some(DocumentStatus::Cleaned),
            "analyzed" => Some(DocumentStatus::Analyzed),
            "rewritten" => Some(DocumentStatus::Rewritten),
            "rewrite_failed" => Some(DocumentStatus::RewriteFailed),
            _ => None,
        }
    }
}

/// A source document within a project.
///
/// Each pipeline stage reads the previous stage's column and fills in its
/// own: parse writes `parsed_content`, clean writes `sanitized_content`,
/// understand writes `analysis`, create writes `rewritten_content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub filename: String,
    /// Source format ("pdf", "docx", "md", "txt").
    pub format: String,
    /// Where the raw upload lives on disk.
    pub file_path: String,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitized_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review status of a book draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Reviewing,
    Approved,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Reviewing => "reviewing",
            DraftStatus::Approved => "approved",
        }
    }

    pub fn parse_str(s: &str) -> Option<DraftStatus> {
        match s {
            "draft" => Some(DraftStatus::Draft),
            "reviewing" => Some(DraftStatus::Reviewing),
            "approved" => Some(DraftStatus::Approved),
            _ => None,
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chapter of a book draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    /// Document this chapter was assembled from, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_id: Option<String>,
}

/// An assembled book draft.
///
/// The structure stage creates the primary draft; each completed
/// translation job creates a non-primary draft in its target language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookDraft {
    pub id: String,
    pub project_id: String,
    /// ISO 639-1 language code.
    pub language: String,
    /// Monotonic per (project, language).
    pub version: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_of_contents: Option<serde_json::Value>,
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_matter: Option<serde_json::Value>,
    pub status: DraftStatus,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_stage_round_trip() {
        for stage in [
            ProjectStage::Upload,
            ProjectStage::Parse,
            ProjectStage::Clean,
            ProjectStage::Understand,
            ProjectStage::Structure,
            ProjectStage::Create,
            ProjectStage::Review,
            ProjectStage::Translate,
            ProjectStage::Generate,
            ProjectStage::Completed,
        ] {
            assert_eq!(ProjectStage::parse_str(stage.as_str()), Some(stage));
        }
        assert_eq!(ProjectStage::parse_str("publish"), None);
    }

    #[test]
    fn test_document_status_round_trip() {
        for status in [
            DocumentStatus::Uploaded,
            DocumentStatus::Parsed,
            DocumentStatus::ParseFailed,
            DocumentStatus::Cleaned,
            DocumentStatus::Analyzed,
            DocumentStatus::Rewritten,
            DocumentStatus::RewriteFailed,
        ] {
            assert_eq!(DocumentStatus::parse_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_chapter_serialization() {
        let chapter = Chapter {
            title: "Introduction".to_string(),
            content: "Once upon a time".to_string(),
            source_document_id: Some("doc-1".to_string()),
        };
        let json = serde_json::to_string(&chapter).unwrap();
        let back: Chapter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chapter);
    }

    #[test]
    fn test_chapter_without_source_skips_field() {
        let chapter = Chapter {
            title: "T".to_string(),
            content: "C".to_string(),
            source_document_id: None,
        };
        let json = serde_json::to_string(&chapter).unwrap();
        assert!(!json.contains("source_document_id"));
    }
}
