//! Core task data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default retry budget for a task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Pipeline stage a task belongs to.
///
/// This is a closed set: every task carries exactly one of these and the
/// dispatcher resolves it to a registered handler. There is no free-form
/// task type string anywhere in the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Extract a normalized AST from each uploaded document.
    Parse,
    /// Detect and replace sensitive entities in parsed text.
    Clean,
    /// Analyze document structure (chapters, headings, key points).
    Understand,
    /// Assemble the analyses into a primary book draft.
    Structure,
    /// Rewrite draft chapters into publishable prose.
    Create,
    /// Fan out translation jobs for the approved draft.
    Translate,
    /// Render the final book artifacts.
    Generate,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [StageKind; 7] = [
        StageKind::Parse,
        StageKind::Clean,
        StageKind::Understand,
        StageKind::Structure,
        StageKind::Create,
        StageKind::Translate,
        StageKind::Generate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Parse => "parse",
            StageKind::Clean => "clean",
            StageKind::Understand => "understand",
            StageKind::Structure => "structure",
            StageKind::Create => "create",
            StageKind::Translate => "translate",
            StageKind::Generate => "generate",
        }
    }

    /// Parse a stage name as received from clients. Unknown names are
    /// rejected at the API boundary, not deep in the dispatcher.
    pub fn parse_str(s: &str) -> Option<StageKind> {
        match s {
            "parse" => Some(StageKind::Parse),
            "clean" => Some(StageKind::Clean),
            "understand" => Some(StageKind::Understand),
            "structure" => Some(StageKind::Structure),
            "create" => Some(StageKind::Create),
            "translate" => Some(StageKind::Translate),
            "generate" => Some(StageKind::Generate),
            _ => None,
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a task.
///
/// State machine flow:
/// ```text
/// Pending -> Running -> Completed
///                    -> Failed    -> Pending (explicit retry)
///                    -> Cancelled -> Pending (explicit retry)
/// Pending -> Cancelled
/// ```
///
/// No other transitions are legal; the store rejects them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Returns true if no further work will happen for this status
    /// without an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Returns true if the task can be cancelled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Returns true if the task can be re-queued via retry.
    pub fn can_retry(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Cancelled)
    }

    /// Returns true if `next` is a legal direct transition from this status.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse_str(s: &str) -> Option<TaskStatus> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated output file reported by the rendering collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedFile {
    pub filename: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Validation summary attached to generated output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationSummary {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Typed result of a completed stage task.
///
/// One variant per stage, serialized as tagged JSON in the store. Consumers
/// match on the variant instead of poking at untyped maps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageResult {
    Parse {
        parsed: u32,
        failed: u32,
        skipped: u32,
    },
    Clean {
        cleaned: u32,
        entities_replaced: u32,
        /// True when entity detection ran on the built-in fallback because
        /// the processing service was unreachable.
        degraded: bool,
    },
    Understand {
        analyzed: u32,
        failed: u32,
        degraded: bool,
    },
    Structure {
        draft_id: String,
        chapter_count: u32,
    },
    Create {
        rewritten: u32,
        failed: u32,
        draft_id: String,
    },
    Translate {
        completed: u32,
        total: u32,
        languages: Vec<String>,
    },
    Generate {
        files: Vec<GeneratedFile>,
        validation: ValidationSummary,
    },
}

/// A unit of pipeline work for one project and one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier (UUID).
    pub id: String,

    /// Project this task operates on.
    pub project_id: String,

    /// Which pipeline stage this task executes.
    pub stage: StageKind,

    /// Current status.
    pub status: TaskStatus,

    /// Coarse progress, 0-100.
    pub progress: u8,

    /// Human-readable status line ("processing document 3/7").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set on the pending -> running transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set when the task reaches a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Error text when status is failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Typed result when status is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,

    /// Number of times this task has been re-queued.
    #[serde(default)]
    pub retry_count: u32,

    /// Retry budget; the recovery scanner fails the task past this.
    pub max_retries: u32,

    /// Liveness signal refreshed while running. A running task whose
    /// heartbeat goes stale is treated as interrupted at the next startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,

    /// Opaque handler checkpoint, reserved for resumable stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<serde_json::Value>,
}

impl Task {
    /// True if the heartbeat is missing or older than `threshold_secs`,
    /// measured against `now`. Only meaningful for running tasks.
    pub fn heartbeat_stale(&self, now: DateTime<Utc>, threshold_secs: i64) -> bool {
        match self.last_heartbeat {
            Some(beat) => (now - beat).num_seconds() > threshold_secs,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_not_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(TaskStatus::Pending.can_cancel());
        assert!(!TaskStatus::Pending.can_retry());
    }

    #[test]
    fn test_running_can_cancel() {
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Running.can_cancel());
        assert!(!TaskStatus::Running.can_retry());
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_cancel());
        }
        assert!(!TaskStatus::Completed.can_retry());
        assert!(TaskStatus::Failed.can_retry());
        assert!(TaskStatus::Cancelled.can_retry());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Cancelled));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Completed));
        // Re-queueing terminal tasks goes through the dedicated retry
        // operation, not a plain status update.
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn test_stage_kind_round_trip() {
        for stage in StageKind::ALL {
            assert_eq!(StageKind::parse_str(stage.as_str()), Some(stage));
        }
        assert_eq!(StageKind::parse_str("upload"), None);
        assert_eq!(StageKind::parse_str("Parse"), None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
        let back: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TaskStatus::Pending);
    }

    #[test]
    fn test_stage_result_serialization() {
        let result = StageResult::Structure {
            draft_id: "draft-1".to_string(),
            chapter_count: 12,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"stage\":\"structure\""));
        assert!(json.contains("draft-1"));

        let back: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_generate_result_serialization() {
        let result = StageResult::Generate {
            files: vec![GeneratedFile {
                filename: "book.epub".to_string(),
                format: "epub".to_string(),
                size_bytes: Some(1024),
            }],
            validation: ValidationSummary {
                valid: true,
                issues: vec![],
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_heartbeat_stale() {
        let now = Utc::now();
        let task = Task {
            id: "t1".to_string(),
            project_id: "p1".to_string(),
            stage: StageKind::Parse,
            status: TaskStatus::Running,
            progress: 10,
            message: None,
            created_at: now,
            started_at: Some(now),
            completed_at: None,
            error: None,
            result: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            last_heartbeat: None,
            checkpoint: None,
        };
        // Missing heartbeat counts as stale.
        assert!(task.heartbeat_stale(now, 300));

        let fresh = Task {
            last_heartbeat: Some(now - chrono::Duration::seconds(60)),
            ..task.clone()
        };
        assert!(!fresh.heartbeat_stale(now, 300));

        let stale = Task {
            last_heartbeat: Some(now - chrono::Duration::seconds(301)),
            ..task
        };
        assert!(stale.heartbeat_stale(now, 300));
    }
}
