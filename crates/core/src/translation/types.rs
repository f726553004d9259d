use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Languages the translation fan-out accepts as targets.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "ja", "ko", "de", "fr", "es", "pt", "it", "nl", "pl", "ru",
];

/// True if `language` is in [`SUPPORTED_LANGUAGES`].
pub fn is_supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

/// Status of a single translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TranslationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One per-language unit of the translation fan-out.
///
/// Jobs are independent of their siblings: one job failing or lagging never
/// blocks another. `result_draft_id` is set only on success and points at a
/// newly created non-primary draft; the source draft is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: String,
    pub project_id: String,
    pub source_draft_id: String,
    pub target_language: String,
    pub status: TranslationStatus,
    /// Percentage 0-100, advanced per translated unit
    pub progress: u8,
    pub provider: Option<String>,
    pub preserve_formatting: bool,
    pub error: Option<String>,
    pub result_draft_id: Option<String>,
    /// Units carried in the source language because their translation
    /// call failed. Non-zero on a completed job means a degraded result.
    pub degraded_units: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
