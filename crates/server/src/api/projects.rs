//! Project, document and draft API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use bindery_core::content::{
    BookDraft, ContentError, CreateDocumentRequest, CreateProjectRequest, Document, DraftStatus,
    Project, ProjectStage,
};
use bindery_core::events::PipelineEvent;

use crate::state::AppState;

const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
    pub description: Option<String>,
    /// Free-form settings (language, author, style, format)
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDocumentBody {
    pub filename: String,
    pub format: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ListProjectsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub current_stage: ProjectStage,
    pub settings: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            current_stage: project.current_stage,
            settings: project.settings,
            created_at: project.created_at.to_rfc3339(),
            updated_at: project.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentErrorResponse {
    pub error: String,
}

fn error_response(error: impl ToString) -> Json<ContentErrorResponse> {
    Json(ContentErrorResponse {
        error: error.to_string(),
    })
}

fn map_content_error(e: ContentError) -> (StatusCode, Json<ContentErrorResponse>) {
    let status = match &e {
        ContentError::ProjectNotFound(_)
        | ContentError::DocumentNotFound(_)
        | ContentError::DraftNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error_response(e))
}

// ============================================================================
// Project handlers
// ============================================================================

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<ProjectResponse>), (StatusCode, Json<ContentErrorResponse>)> {
    if body.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            error_response("Project name must not be empty"),
        ));
    }

    let project = state
        .content_store()
        .create_project(CreateProjectRequest {
            name: body.name,
            description: body.description,
            settings: body.settings,
        })
        .map_err(map_content_error)?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProjectsParams>,
) -> Result<Json<Vec<ProjectResponse>>, (StatusCode, Json<ContentErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let projects = state
        .content_store()
        .list_projects(limit, offset)
        .map_err(map_content_error)?;

    Ok(Json(
        projects.into_iter().map(ProjectResponse::from).collect(),
    ))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, (StatusCode, Json<ContentErrorResponse>)> {
    match state.content_store().get_project(&id) {
        Ok(Some(project)) => Ok(Json(ProjectResponse::from(project))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            error_response(format!("Project not found: {}", id)),
        )),
        Err(e) => Err(map_content_error(e)),
    }
}

/// Delete a project and everything it owns: documents, drafts, tasks and
/// translation jobs.
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ContentErrorResponse>)> {
    state
        .content_store()
        .delete_project(&id)
        .map_err(map_content_error)?;

    if let Err(e) = state.task_store().delete_by_project(&id) {
        warn!(project_id = %id, "Failed to delete project tasks: {}", e);
    }
    if let Err(e) = state.translation_store().delete_by_project(&id) {
        warn!(project_id = %id, "Failed to delete project translation jobs: {}", e);
    }

    info!(project_id = %id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Document handlers
// ============================================================================

/// Register an already-uploaded document file with a project
pub async fn register_document(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(body): Json<RegisterDocumentBody>,
) -> Result<(StatusCode, Json<Document>), (StatusCode, Json<ContentErrorResponse>)> {
    match state.content_store().get_project(&project_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                error_response(format!("Project not found: {}", project_id)),
            ));
        }
        Err(e) => return Err(map_content_error(e)),
    }

    let document = state
        .content_store()
        .create_document(CreateDocumentRequest {
            project_id,
            filename: body.filename,
            format: body.format,
            file_path: body.file_path,
        })
        .map_err(map_content_error)?;

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Document>>, (StatusCode, Json<ContentErrorResponse>)> {
    let documents = state
        .content_store()
        .list_documents(&project_id)
        .map_err(map_content_error)?;
    Ok(Json(documents))
}

// ============================================================================
// Draft handlers
// ============================================================================

pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<BookDraft>>, (StatusCode, Json<ContentErrorResponse>)> {
    let drafts = state
        .content_store()
        .list_drafts(&project_id)
        .map_err(map_content_error)?;
    Ok(Json(drafts))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookDraft>, (StatusCode, Json<ContentErrorResponse>)> {
    match state.content_store().get_draft(&id) {
        Ok(Some(draft)) => Ok(Json(draft)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            error_response(format!("Draft not found: {}", id)),
        )),
        Err(e) => Err(map_content_error(e)),
    }
}

/// Approve a draft under review. Approving the primary draft releases the
/// project from the review gate into translate.
pub async fn approve_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookDraft>, (StatusCode, Json<ContentErrorResponse>)> {
    let draft = match state.content_store().get_draft(&id) {
        Ok(Some(draft)) => draft,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                error_response(format!("Draft not found: {}", id)),
            ));
        }
        Err(e) => return Err(map_content_error(e)),
    };

    if draft.status != DraftStatus::Reviewing {
        return Err((
            StatusCode::CONFLICT,
            error_response(format!(
                "Cannot approve draft: current status is {}",
                draft.status.as_str()
            )),
        ));
    }

    let draft = state
        .content_store()
        .set_draft_status(&id, DraftStatus::Approved)
        .map_err(map_content_error)?;

    state.events().try_emit(PipelineEvent::DraftApproved {
        project_id: draft.project_id.clone(),
        draft_id: draft.id.clone(),
    });

    if draft.is_primary {
        if let Err(e) = state.sequencer().release_review(&draft.project_id).await {
            warn!(project_id = %draft.project_id, "Failed to release review gate: {}", e);
        }
    }

    Ok(Json(draft))
}
