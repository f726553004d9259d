//! Task API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bindery_core::events::PipelineEvent;
use bindery_core::pipeline::DispatchError;
use bindery_core::task::{
    CreateTaskRequest, StageKind, StageResult, Task, TaskError, TaskFilter, TaskStatus,
};

use crate::state::AppState;

/// Maximum allowed limit for task queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for task queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a task
#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    pub project_id: String,
    /// Stage to run (parse, clean, understand, structure, create,
    /// translate, generate)
    pub stage: String,
    /// Retry budget override
    pub max_retries: Option<u32>,
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    pub project_id: Option<String>,
    pub status: Option<String>,
    pub stage: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for task operations
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub project_id: String,
    pub stage: StageKind,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: Option<String>,
    pub error: Option<String>,
    pub result: Option<StageResult>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub last_heartbeat: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            stage: task.stage,
            status: task.status,
            progress: task.progress,
            message: task.message,
            error: task.error,
            result: task.result,
            retry_count: task.retry_count,
            max_retries: task.max_retries,
            created_at: task.created_at.to_rfc3339(),
            started_at: task.started_at.map(|t| t.to_rfc3339()),
            completed_at: task.completed_at.map(|t| t.to_rfc3339()),
            last_heartbeat: task.last_heartbeat.map(|t| t.to_rfc3339()),
        }
    }
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TaskErrorResponse {
    pub error: String,
}

fn error_response(error: impl ToString) -> Json<TaskErrorResponse> {
    Json(TaskErrorResponse {
        error: error.to_string(),
    })
}

fn map_task_error(e: TaskError) -> (StatusCode, Json<TaskErrorResponse>) {
    let status = match &e {
        TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        TaskError::InvalidTransition { .. } | TaskError::InvalidState { .. } => {
            StatusCode::CONFLICT
        }
        TaskError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error_response(e))
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a task and enqueue it for execution
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<TaskResponse>), (StatusCode, Json<TaskErrorResponse>)> {
    let Some(stage) = StageKind::parse_str(&body.stage) else {
        return Err((
            StatusCode::BAD_REQUEST,
            error_response(format!("Unknown stage: {}", body.stage)),
        ));
    };

    match state.content_store().get_project(&body.project_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                error_response(format!("Project not found: {}", body.project_id)),
            ));
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, error_response(e))),
    }

    let task = state
        .task_store()
        .create(CreateTaskRequest {
            project_id: body.project_id,
            stage,
            max_retries: body.max_retries,
        })
        .map_err(map_task_error)?;

    state.events().try_emit(PipelineEvent::TaskCreated {
        task_id: task.id.clone(),
        project_id: task.project_id.clone(),
        stage: task.stage.as_str().to_string(),
    });

    match state.dispatcher().submit(&task.id) {
        Ok(()) => Ok((StatusCode::CREATED, Json(TaskResponse::from(task)))),
        Err(e @ DispatchError::QueueFull) | Err(e @ DispatchError::Closed) => {
            Err((StatusCode::SERVICE_UNAVAILABLE, error_response(e)))
        }
    }
}

/// Get a task by ID
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, (StatusCode, Json<TaskErrorResponse>)> {
    match state.task_store().get(&id) {
        Ok(Some(task)) => Ok(Json(TaskResponse::from(task))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            error_response(format!("Task not found: {}", id)),
        )),
        Err(e) => Err(map_task_error(e)),
    }
}

/// List tasks with optional filters
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<Json<ListTasksResponse>, (StatusCode, Json<TaskErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = TaskFilter::new();
    if let Some(ref project_id) = params.project_id {
        base_filter = base_filter.with_project(project_id.clone());
    }
    if let Some(ref status) = params.status {
        let Some(status) = TaskStatus::parse_str(status) else {
            return Err((
                StatusCode::BAD_REQUEST,
                error_response(format!("Unknown status: {}", status)),
            ));
        };
        base_filter = base_filter.with_status(status);
    }
    if let Some(ref stage) = params.stage {
        let Some(stage) = StageKind::parse_str(stage) else {
            return Err((
                StatusCode::BAD_REQUEST,
                error_response(format!("Unknown stage: {}", stage)),
            ));
        };
        base_filter = base_filter.with_stage(stage);
    }

    let query_filter = TaskFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let tasks = state.task_store().list(&query_filter).map_err(map_task_error)?;
    let total = state.task_store().count(&base_filter).map_err(map_task_error)?;

    Ok(Json(ListTasksResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Cancel a pending or running task
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, (StatusCode, Json<TaskErrorResponse>)> {
    let task = state
        .task_store()
        .update_status(&id, TaskStatus::Cancelled)
        .map_err(map_task_error)?;

    state.events().try_emit(PipelineEvent::TaskCancelled {
        task_id: task.id.clone(),
        project_id: task.project_id.clone(),
    });

    Ok(Json(TaskResponse::from(task)))
}

/// Re-queue a failed or cancelled task
pub async fn retry_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, (StatusCode, Json<TaskErrorResponse>)> {
    let task = state
        .task_store()
        .reset_for_retry(&id)
        .map_err(map_task_error)?;

    state.events().try_emit(PipelineEvent::TaskRetried {
        task_id: task.id.clone(),
        project_id: task.project_id.clone(),
        retry_count: task.retry_count,
    });

    match state.dispatcher().submit(&task.id) {
        Ok(()) => Ok(Json(TaskResponse::from(task))),
        Err(e) => Err((StatusCode::SERVICE_UNAVAILABLE, error_response(e))),
    }
}

/// Refresh a task's liveness heartbeat
pub async fn heartbeat_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<TaskErrorResponse>)> {
    state
        .task_store()
        .touch_heartbeat(&id)
        .map_err(map_task_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a task record. Refused while the task is running.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<TaskErrorResponse>)> {
    let task = state.task_store().delete(&id).map_err(map_task_error)?;

    state.events().try_emit(PipelineEvent::TaskDeleted {
        task_id: task.id,
        project_id: task.project_id,
    });

    Ok(StatusCode::NO_CONTENT)
}
