use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events recorded by the pipeline event log
///
/// Every state change worth auditing after the fact goes through here:
/// service lifecycle, task lifecycle, stage advancement, review decisions
/// and translation fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Service started
    ServiceStarted { version: String, config_hash: String },

    /// Service stopped
    ServiceStopped { reason: String },

    /// A stage task was created and queued
    TaskCreated {
        task_id: String,
        project_id: String,
        stage: String,
    },

    /// A worker claimed a task and started executing it
    TaskStarted {
        task_id: String,
        project_id: String,
        stage: String,
    },

    /// A task finished successfully
    TaskCompleted {
        task_id: String,
        project_id: String,
        stage: String,
    },

    /// A task finished with an error
    TaskFailed {
        task_id: String,
        project_id: String,
        stage: String,
        error: String,
    },

    /// A task was cancelled by request
    TaskCancelled { task_id: String, project_id: String },

    /// A terminal task was manually re-queued
    TaskRetried {
        task_id: String,
        project_id: String,
        retry_count: u32,
    },

    /// The startup recovery scan found an interrupted task
    ///
    /// `requeued` is true when the task went back to the queue, false when
    /// its retry budget was exhausted and it was failed instead.
    TaskRecovered {
        task_id: String,
        project_id: String,
        requeued: bool,
    },

    /// A task record was deleted
    TaskDeleted { task_id: String, project_id: String },

    /// A project moved to the next pipeline stage
    StageAdvanced {
        project_id: String,
        from_stage: String,
        to_stage: String,
    },

    /// A book draft passed manual review
    DraftApproved { project_id: String, draft_id: String },

    /// A translation job was created
    TranslationRequested {
        project_id: String,
        job_id: String,
        language: String,
    },

    /// A translation job produced a result draft
    TranslationCompleted {
        project_id: String,
        job_id: String,
        language: String,
        draft_id: String,
    },

    /// A translation job failed
    TranslationFailed {
        project_id: String,
        job_id: String,
        language: String,
        error: String,
    },

    /// A translation job was cancelled
    TranslationCancelled { project_id: String, job_id: String },

    /// A stage fell back to degraded output because the processor was down
    ProcessorDegraded {
        task_id: String,
        project_id: String,
        stage: String,
        reason: String,
    },
}

impl PipelineEvent {
    /// Get the event type as a string (for storage/filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TaskCreated { .. } => "task_created",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskFailed { .. } => "task_failed",
            Self::TaskCancelled { .. } => "task_cancelled",
            Self::TaskRetried { .. } => "task_retried",
            Self::TaskRecovered { .. } => "task_recovered",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::StageAdvanced { .. } => "stage_advanced",
            Self::DraftApproved { .. } => "draft_approved",
            Self::TranslationRequested { .. } => "translation_requested",
            Self::TranslationCompleted { .. } => "translation_completed",
            Self::TranslationFailed { .. } => "translation_failed",
            Self::TranslationCancelled { .. } => "translation_cancelled",
            Self::ProcessorDegraded { .. } => "processor_degraded",
        }
    }

    /// Extract the task ID if this event relates to a task
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskCreated { task_id, .. }
            | Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::TaskCancelled { task_id, .. }
            | Self::TaskRetried { task_id, .. }
            | Self::TaskRecovered { task_id, .. }
            | Self::TaskDeleted { task_id, .. }
            | Self::ProcessorDegraded { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    /// Extract the project ID if this event relates to a project
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::TaskCreated { project_id, .. }
            | Self::TaskStarted { project_id, .. }
            | Self::TaskCompleted { project_id, .. }
            | Self::TaskFailed { project_id, .. }
            | Self::TaskCancelled { project_id, .. }
            | Self::TaskRetried { project_id, .. }
            | Self::TaskRecovered { project_id, .. }
            | Self::TaskDeleted { project_id, .. }
            | Self::StageAdvanced { project_id, .. }
            | Self::DraftApproved { project_id, .. }
            | Self::TranslationRequested { project_id, .. }
            | Self::TranslationCompleted { project_id, .. }
            | Self::TranslationFailed { project_id, .. }
            | Self::TranslationCancelled { project_id, .. }
            | Self::ProcessorDegraded { project_id, .. } => Some(project_id),
            _ => None,
        }
    }
}

/// A stored event record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record ID (assigned by storage)
    pub id: i64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Event type string (denormalized for querying)
    pub event_type: String,
    /// Related task ID if applicable
    pub task_id: Option<String>,
    /// Related project ID if applicable
    pub project_id: Option<String>,
    /// The full event data
    pub data: PipelineEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_strings() {
        let event = PipelineEvent::TaskCreated {
            task_id: "t-1".to_string(),
            project_id: "p-1".to_string(),
            stage: "parse".to_string(),
        };
        assert_eq!(event.event_type(), "task_created");

        let event = PipelineEvent::ServiceStopped {
            reason: "shutdown".to_string(),
        };
        assert_eq!(event.event_type(), "service_stopped");
    }

    #[test]
    fn test_task_id_extraction() {
        let event = PipelineEvent::TaskFailed {
            task_id: "t-9".to_string(),
            project_id: "p-1".to_string(),
            stage: "clean".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(event.task_id(), Some("t-9"));
        assert_eq!(event.project_id(), Some("p-1"));

        let event = PipelineEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc".to_string(),
        };
        assert_eq!(event.task_id(), None);
        assert_eq!(event.project_id(), None);
    }

    #[test]
    fn test_project_only_events() {
        let event = PipelineEvent::StageAdvanced {
            project_id: "p-2".to_string(),
            from_stage: "create".to_string(),
            to_stage: "review".to_string(),
        };
        assert_eq!(event.task_id(), None);
        assert_eq!(event.project_id(), Some("p-2"));
    }

    #[test]
    fn test_serialization_tag() {
        let event = PipelineEvent::TaskRecovered {
            task_id: "t-1".to_string(),
            project_id: "p-1".to_string(),
            requeued: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task_recovered");
        assert_eq!(json["requeued"], true);

        let back: PipelineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
