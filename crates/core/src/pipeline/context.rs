use std::sync::Arc;

use crate::task::{Task, TaskError, TaskStatus, TaskStore};

/// Handle a stage handler uses to report on and observe its own task.
///
/// Cancellation is cooperative: `is_cancelled` re-reads the task row, so a
/// cancel request lands at the handler's next check, never mid-unit. The
/// handle never caches the task across an await.
#[derive(Clone)]
pub struct TaskHandle {
    task_id: String,
    store: Arc<dyn TaskStore>,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            task_id: task_id.into(),
            store,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Report progress. Also refreshes the heartbeat.
    pub fn set_progress(&self, progress: u8, message: &str) -> Result<(), TaskError> {
        self.store
            .set_progress(&self.task_id, progress, Some(message))
    }

    /// Refresh the liveness heartbeat without touching progress.
    pub fn heartbeat(&self) -> Result<(), TaskError> {
        self.store.touch_heartbeat(&self.task_id)
    }

    /// True when the task has been cancelled. Handlers check this before
    /// each unit of work and stop without finalizing when it fires.
    pub fn is_cancelled(&self) -> Result<bool, TaskError> {
        Ok(self.current()?.status == TaskStatus::Cancelled)
    }

    /// Re-fetch the task row.
    pub fn current(&self) -> Result<Task, TaskError> {
        self.store
            .get(&self.task_id)?
            .ok_or_else(|| TaskError::NotFound(self.task_id.clone()))
    }
}
