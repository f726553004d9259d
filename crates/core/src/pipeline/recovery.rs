use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::events::{EventLogHandle, PipelineEvent};
use crate::task::{TaskError, TaskFilter, TaskStatus, TaskStore};

use super::sequencer::StageSequencer;

/// Outcome of one startup recovery scan.
#[derive(Debug, Default, PartialEq)]
pub struct RecoveryReport {
    /// Interrupted tasks returned to the queue.
    pub requeued: u32,
    /// Interrupted tasks failed because their retry budget was spent.
    pub exhausted: u32,
}

/// Scan for tasks left running by a previous process and resolve them.
///
/// A running task whose heartbeat is missing or older than
/// `stale_after_secs` belongs to a dead worker. It goes back to pending
/// with its retry count bumped, or fails permanently once the budget is
/// gone. Runs before the server accepts work, so no live worker can be
/// mistaken for a dead one.
pub async fn recover_interrupted_tasks(
    tasks: &Arc<dyn TaskStore>,
    stale_after_secs: u64,
    events: &EventLogHandle,
) -> Result<RecoveryReport, TaskError> {
    let cutoff = Utc::now() - Duration::seconds(stale_after_secs as i64);
    let stale = tasks.stale_running(cutoff)?;

    if stale.is_empty() {
        info!("Recovery scan found no interrupted tasks");
        return Ok(RecoveryReport::default());
    }

    info!(count = stale.len(), "Recovery scan found interrupted tasks");
    let mut report = RecoveryReport::default();

    for task in stale {
        let requeued = if task.retry_count < task.max_retries {
            match tasks.requeue_interrupted(&task.id) {
                Ok(task) => {
                    info!(
                        task_id = %task.id,
                        stage = %task.stage,
                        retry_count = task.retry_count,
                        "Re-queued interrupted task"
                    );
                    report.requeued += 1;
                    true
                }
                Err(e) => {
                    error!(task_id = %task.id, "Failed to re-queue interrupted task: {}", e);
                    continue;
                }
            }
        } else {
            match tasks.fail(&task.id, "interrupted and retry budget exhausted") {
                Ok(_) => {
                    warn!(
                        task_id = %task.id,
                        stage = %task.stage,
                        retry_count = task.retry_count,
                        "Interrupted task exhausted its retries, failing"
                    );
                    report.exhausted += 1;
                    false
                }
                Err(e) => {
                    error!(task_id = %task.id, "Failed to fail interrupted task: {}", e);
                    continue;
                }
            }
        };

        events
            .emit(PipelineEvent::TaskRecovered {
                task_id: task.id.clone(),
                project_id: task.project_id.clone(),
                requeued,
            })
            .await;
    }

    Ok(report)
}

/// Re-align project stages with completions recorded by a previous process.
///
/// Completing a task and advancing its project are two separate writes; a
/// crash between them leaves the project parked behind an already completed
/// task. Replaying every completed task through the sequencer repairs that:
/// an advance only fires while the task's stage is still the project's
/// current stage, so projects that already moved on, including through the
/// manual review and translate gates, are untouched.
pub async fn replay_completed_stages(
    tasks: &Arc<dyn TaskStore>,
    sequencer: &StageSequencer,
) -> Result<u32, TaskError> {
    let completed = tasks.list(
        &TaskFilter::new()
            .with_status(TaskStatus::Completed)
            .with_limit(i64::MAX),
    )?;

    let mut advanced = 0u32;
    for task in completed {
        match sequencer.advance_on_completion(&task).await {
            Ok(Some(stage)) => {
                info!(
                    task_id = %task.id,
                    project_id = %task.project_id,
                    stage = %stage,
                    "Re-applied lost stage advance"
                );
                advanced += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(task_id = %task.id, "Could not replay stage advance: {}", e);
            }
        }
    }

    if advanced > 0 {
        info!(advanced, "Recovery re-applied project stage advances");
    }
    Ok(advanced)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::content::{ContentStore, CreateProjectRequest, ProjectStage, SqliteContentStore};
    use crate::events::EventEnvelope;
    use crate::task::{CreateTaskRequest, SqliteTaskStore, StageKind, StageResult, TaskStatus};

    struct Fixture {
        tasks: Arc<dyn TaskStore>,
        store: Arc<SqliteTaskStore>,
        events: EventLogHandle,
        rx: mpsc::Receiver<EventEnvelope>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let (tx, rx) = mpsc::channel(64);
        Fixture {
            tasks: store.clone(),
            store,
            events: EventLogHandle::new(tx),
            rx,
        }
    }

    impl Fixture {
        /// A running task with no heartbeat, as an interrupted process
        /// leaves it.
        fn interrupted_task(&self, retry_count: u32) -> String {
            let task = self
                .store
                .create(CreateTaskRequest {
                    project_id: "p-1".to_string(),
                    stage: StageKind::Parse,
                    max_retries: Some(3),
                })
                .unwrap();
            for _ in 0..retry_count {
                self.store
                    .update_status(&task.id, TaskStatus::Running)
                    .unwrap();
                self.store.requeue_interrupted(&task.id).unwrap();
            }
            self.store
                .update_status(&task.id, TaskStatus::Running)
                .unwrap();
            task.id
        }
    }

    #[tokio::test]
    async fn test_requeues_interrupted_task() {
        let mut f = fixture();
        let task_id = f.interrupted_task(0);

        let report = recover_interrupted_tasks(&f.tasks, 0, &f.events)
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport { requeued: 1, exhausted: 0 });

        let task = f.store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 1);
        assert_eq!(task.progress, 0);

        let envelope = f.rx.try_recv().unwrap();
        assert!(matches!(
            envelope.event,
            PipelineEvent::TaskRecovered { requeued: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_exhausted_budget_fails_permanently() {
        let mut f = fixture();
        let task_id = f.interrupted_task(3);

        let report = recover_interrupted_tasks(&f.tasks, 0, &f.events)
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport { requeued: 0, exhausted: 1 });

        let task = f.store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.unwrap().contains("retry budget exhausted"));

        let envelope = f.rx.try_recv().unwrap();
        assert!(matches!(
            envelope.event,
            PipelineEvent::TaskRecovered { requeued: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_fresh_heartbeat_is_left_alone() {
        let f = fixture();
        let task_id = {
            let task = f
                .store
                .create(CreateTaskRequest::new("p-1", StageKind::Parse))
                .unwrap();
            f.store
                .update_status(&task.id, TaskStatus::Running)
                .unwrap();
            f.store.touch_heartbeat(&task.id).unwrap();
            task.id
        };

        let report = recover_interrupted_tasks(&f.tasks, 3600, &f.events)
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport::default());

        let task = f.store.get(&task_id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent() {
        let f = fixture();
        f.interrupted_task(0);

        let first = recover_interrupted_tasks(&f.tasks, 0, &f.events)
            .await
            .unwrap();
        assert_eq!(first.requeued, 1);

        // The task is pending now; a second scan finds nothing
        let second = recover_interrupted_tasks(&f.tasks, 0, &f.events)
            .await
            .unwrap();
        assert_eq!(second, RecoveryReport::default());
    }

    #[tokio::test]
    async fn test_terminal_tasks_are_ignored() {
        let f = fixture();
        let task = f
            .store
            .create(CreateTaskRequest::new("p-1", StageKind::Parse))
            .unwrap();
        f.store
            .update_status(&task.id, TaskStatus::Running)
            .unwrap();
        f.store.fail(&task.id, "boom").unwrap();

        let report = recover_interrupted_tasks(&f.tasks, 0, &f.events)
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport::default());
    }

    #[tokio::test]
    async fn test_replay_repairs_stale_project_stage() {
        let f = fixture();
        let content = Arc::new(SqliteContentStore::in_memory().unwrap());
        let sequencer = StageSequencer::new(content.clone(), f.events.clone());

        let project = content
            .create_project(CreateProjectRequest::new("book"))
            .unwrap();
        let task = f
            .store
            .create(CreateTaskRequest::new(project.id.clone(), StageKind::Parse))
            .unwrap();
        f.store
            .update_status(&task.id, TaskStatus::Running)
            .unwrap();
        // Completion was recorded, but the process died before the advance
        f.store
            .complete(
                &task.id,
                StageResult::Parse {
                    parsed: 1,
                    failed: 0,
                    skipped: 0,
                },
            )
            .unwrap();
        assert_eq!(
            content.get_project(&project.id).unwrap().unwrap().current_stage,
            ProjectStage::Upload
        );

        let advanced = replay_completed_stages(&f.tasks, &sequencer).await.unwrap();
        assert_eq!(advanced, 1);
        assert_eq!(
            content.get_project(&project.id).unwrap().unwrap().current_stage,
            ProjectStage::Clean
        );

        // A second scan finds nothing left to repair
        let advanced = replay_completed_stages(&f.tasks, &sequencer).await.unwrap();
        assert_eq!(advanced, 0);
        assert_eq!(
            content.get_project(&project.id).unwrap().unwrap().current_stage,
            ProjectStage::Clean
        );
    }

    #[tokio::test]
    async fn test_replay_does_not_move_projects_past_manual_gates() {
        let f = fixture();
        let content = Arc::new(SqliteContentStore::in_memory().unwrap());
        let sequencer = StageSequencer::new(content.clone(), f.events.clone());

        // The create completion already advanced this project; it now waits
        // for a reviewer
        let project = content
            .create_project(CreateProjectRequest::new("book"))
            .unwrap();
        content
            .set_project_stage(&project.id, ProjectStage::Review)
            .unwrap();
        let task = f
            .store
            .create(CreateTaskRequest::new(project.id.clone(), StageKind::Create))
            .unwrap();
        f.store
            .update_status(&task.id, TaskStatus::Running)
            .unwrap();
        f.store
            .complete(
                &task.id,
                StageResult::Create {
                    rewritten: 1,
                    failed: 0,
                    draft_id: "d-1".to_string(),
                },
            )
            .unwrap();

        let advanced = replay_completed_stages(&f.tasks, &sequencer).await.unwrap();
        assert_eq!(advanced, 0);
        assert_eq!(
            content.get_project(&project.id).unwrap().unwrap().current_stage,
            ProjectStage::Review
        );
    }
}
