//! Task storage trait and types.

use chrono::{DateTime, Utc};

use crate::task::{StageKind, StageResult, Task, TaskStatus};

/// Error type for task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    /// The requested status change is outside the state machine.
    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// The operation is not allowed in the task's current status
    /// (retry of a completed task, delete of a running one).
    #[error("Cannot {operation} task {task_id}: current status is {status}")]
    InvalidState {
        task_id: String,
        status: TaskStatus,
        operation: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new task.
#[derive(Debug, Clone)]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub stage: StageKind,
    /// Retry budget; None uses the default.
    pub max_retries: Option<u32>,
}

impl CreateTaskRequest {
    pub fn new(project_id: impl Into<String>, stage: StageKind) -> Self {
        Self {
            project_id: project_id.into(),
            stage,
            max_retries: None,
        }
    }
}

/// Filter for querying tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub stage: Option<StageKind>,
    pub limit: i64,
    pub offset: i64,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self {
            project_id: None,
            status: None,
            stage: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_stage(mut self, stage: StageKind) -> Self {
        self.stage = Some(stage);
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

/// Trait for task storage backends.
///
/// All status changes go through this trait so the state machine is
/// enforced in exactly one place.
pub trait TaskStore: Send + Sync {
    /// Create a new pending task.
    fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskError>;

    /// Get a task by ID.
    fn get(&self, id: &str) -> Result<Option<Task>, TaskError>;

    /// List tasks matching the filter, newest first.
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError>;

    /// Count tasks matching the filter.
    fn count(&self, filter: &TaskFilter) -> Result<i64, TaskError>;

    /// Transition a task to a new status, validating against the state
    /// machine. Sets `started_at` on entry to running and `completed_at`
    /// on entry to a terminal status.
    fn update_status(&self, id: &str, status: TaskStatus) -> Result<Task, TaskError>;

    /// Mark a running task completed with its typed result. Progress is
    /// forced to 100.
    fn complete(&self, id: &str, result: StageResult) -> Result<Task, TaskError>;

    /// Mark a running task failed with an error message.
    fn fail(&self, id: &str, error: &str) -> Result<Task, TaskError>;

    /// Update progress and status message. Also refreshes the heartbeat;
    /// a task reporting progress is alive by definition.
    fn set_progress(&self, id: &str, progress: u8, message: Option<&str>)
        -> Result<(), TaskError>;

    /// Refresh the liveness heartbeat.
    fn touch_heartbeat(&self, id: &str) -> Result<(), TaskError>;

    /// Re-queue a failed or cancelled task: status back to pending,
    /// retry_count incremented, progress/error/result/timestamps cleared.
    fn reset_for_retry(&self, id: &str) -> Result<Task, TaskError>;

    /// Running tasks whose heartbeat is missing or older than `cutoff`.
    /// Used by the startup recovery scan.
    fn stale_running(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>, TaskError>;

    /// Recovery path: return an interrupted running task to pending with
    /// retry_count incremented and execution state cleared. Only legal
    /// from running; normal retries go through `reset_for_retry`.
    fn requeue_interrupted(&self, id: &str) -> Result<Task, TaskError>;

    /// Permanently delete a task. Refused while the task is running.
    fn delete(&self, id: &str) -> Result<Task, TaskError>;

    /// Delete all tasks belonging to a project. Returns the number removed.
    fn delete_by_project(&self, project_id: &str) -> Result<usize, TaskError>;
}
