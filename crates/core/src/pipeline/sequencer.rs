use std::sync::Arc;

use tracing::{debug, info};

use crate::content::{ContentError, ContentStore, ProjectStage};
use crate::events::{EventLogHandle, PipelineEvent};
use crate::task::{StageKind, Task};

/// The project stage during which a given task stage runs.
pub fn project_stage_for(stage: StageKind) -> ProjectStage {
    match stage {
        StageKind::Parse => ProjectStage::Parse,
        StageKind::Clean => ProjectStage::Clean,
        StageKind::Understand => ProjectStage::Understand,
        StageKind::Structure => ProjectStage::Structure,
        StageKind::Create => ProjectStage::Create,
        StageKind::Translate => ProjectStage::Translate,
        StageKind::Generate => ProjectStage::Generate,
    }
}

/// Where a project lands after the given stage's task completes.
///
/// `Create` lands in the manual review gate; `Translate` returns None
/// because leaving it is an explicit client action (translations complete),
/// not a task completion.
pub fn next_stage_after(stage: StageKind) -> Option<ProjectStage> {
    match stage {
        StageKind::Parse => Some(ProjectStage::Clean),
        StageKind::Clean => Some(ProjectStage::Understand),
        StageKind::Understand => Some(ProjectStage::Structure),
        StageKind::Structure => Some(ProjectStage::Create),
        StageKind::Create => Some(ProjectStage::Review),
        StageKind::Translate => None,
        StageKind::Generate => Some(ProjectStage::Completed),
    }
}

/// Advances a project's current stage when the task that just completed is
/// authoritative for it.
#[derive(Clone)]
pub struct StageSequencer {
    content: Arc<dyn ContentStore>,
    events: EventLogHandle,
}

impl StageSequencer {
    pub fn new(content: Arc<dyn ContentStore>, events: EventLogHandle) -> Self {
        Self { content, events }
    }

    /// Advance the owning project after `task` completed.
    ///
    /// Returns the new stage, or None when the completion does not move the
    /// project: the project has already moved past this stage (a stale or
    /// retried task must never regress or skip it), or the stage has no
    /// automatic successor.
    pub async fn advance_on_completion(
        &self,
        task: &Task,
    ) -> Result<Option<ProjectStage>, ContentError> {
        let project = self
            .content
            .get_project(&task.project_id)?
            .ok_or_else(|| ContentError::ProjectNotFound(task.project_id.clone()))?;

        let expected = project_stage_for(task.stage);
        // A first parse completion finds the project still in upload.
        let authoritative = project.current_stage == expected
            || (task.stage == StageKind::Parse && project.current_stage == ProjectStage::Upload);

        if !authoritative {
            debug!(
                project_id = %project.id,
                task_id = %task.id,
                stage = %task.stage,
                current_stage = %project.current_stage,
                "Stale stage completion, not advancing project"
            );
            return Ok(None);
        }

        let Some(next) = next_stage_after(task.stage) else {
            return Ok(None);
        };

        self.transition(&project.id, project.current_stage, next)
            .await?;
        Ok(Some(next))
    }

    /// Release an approved project from the review gate into translate.
    ///
    /// No-op (returns None) unless the project is currently in review.
    pub async fn release_review(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectStage>, ContentError> {
        self.release(project_id, ProjectStage::Review, ProjectStage::Translate)
            .await
    }

    /// Declare the translation fan-out complete, moving translate to
    /// generate. No-op unless the project is currently in translate.
    pub async fn complete_translations(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectStage>, ContentError> {
        self.release(project_id, ProjectStage::Translate, ProjectStage::Generate)
            .await
    }

    async fn release(
        &self,
        project_id: &str,
        from: ProjectStage,
        to: ProjectStage,
    ) -> Result<Option<ProjectStage>, ContentError> {
        let project = self
            .content
            .get_project(project_id)?
            .ok_or_else(|| ContentError::ProjectNotFound(project_id.to_string()))?;

        if project.current_stage != from {
            debug!(
                project_id = %project_id,
                current_stage = %project.current_stage,
                expected = %from,
                "Stage release does not apply"
            );
            return Ok(None);
        }

        self.transition(project_id, from, to).await?;
        Ok(Some(to))
    }

    async fn transition(
        &self,
        project_id: &str,
        from: ProjectStage,
        to: ProjectStage,
    ) -> Result<(), ContentError> {
        self.content.set_project_stage(project_id, to)?;
        info!(project_id = %project_id, from = %from, to = %to, "Project advanced");

        self.events
            .emit(PipelineEvent::StageAdvanced {
                project_id: project_id.to_string(),
                from_stage: from.as_str().to_string(),
                to_stage: to.as_str().to_string(),
            })
            .await;

        Ok(())
    }
}
