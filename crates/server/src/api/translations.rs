//! Translation API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bindery_core::content::ContentError;
use bindery_core::translation::{
    TranslationError, TranslationFilter, TranslationJob, TranslationStatus, SUPPORTED_LANGUAGES,
};

use crate::state::AppState;

const MAX_LIMIT: i64 = 1000;
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the translation fan-out
#[derive(Debug, Deserialize)]
pub struct CreateTranslationsBody {
    pub source_draft_id: String,
    pub languages: Vec<String>,
    pub provider: Option<String>,
    #[serde(default = "default_preserve_formatting")]
    pub preserve_formatting: bool,
}

fn default_preserve_formatting() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ListTranslationsParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TranslationJobResponse {
    pub id: String,
    pub project_id: String,
    pub source_draft_id: String,
    pub target_language: String,
    pub status: TranslationStatus,
    pub progress: u8,
    pub provider: Option<String>,
    pub preserve_formatting: bool,
    pub error: Option<String>,
    pub result_draft_id: Option<String>,
    /// Units the result carries untranslated after per-unit failures
    pub degraded_units: u32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<TranslationJob> for TranslationJobResponse {
    fn from(job: TranslationJob) -> Self {
        Self {
            id: job.id,
            project_id: job.project_id,
            source_draft_id: job.source_draft_id,
            target_language: job.target_language,
            status: job.status,
            progress: job.progress,
            provider: job.provider,
            preserve_formatting: job.preserve_formatting,
            error: job.error,
            result_draft_id: job.result_draft_id,
            degraded_units: job.degraded_units,
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Response for the fan-out request
#[derive(Debug, Serialize)]
pub struct FanoutResponse {
    pub created: Vec<TranslationJobResponse>,
    /// Languages skipped because a job is already in flight
    pub skipped: Vec<String>,
    pub unsupported: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListTranslationsResponse {
    pub translations: Vec<TranslationJobResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct StageGateResponse {
    pub project_id: String,
    pub current_stage: String,
}

#[derive(Debug, Serialize)]
pub struct TranslationErrorResponse {
    pub error: String,
}

fn error_response(error: impl ToString) -> Json<TranslationErrorResponse> {
    Json(TranslationErrorResponse {
        error: error.to_string(),
    })
}

fn map_translation_error(e: TranslationError) -> (StatusCode, Json<TranslationErrorResponse>) {
    let status = match &e {
        TranslationError::JobNotFound(_) | TranslationError::SourceDraftNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        TranslationError::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
        TranslationError::SourceDraftNotApproved(_) | TranslationError::InvalidState { .. } => {
            StatusCode::CONFLICT
        }
        TranslationError::Processor(_) | TranslationError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error_response(e))
}

// ============================================================================
// Handlers
// ============================================================================

/// List supported target languages
pub async fn list_languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect(),
    })
}

/// Fan out translation jobs for an approved draft
pub async fn create_translations(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTranslationsBody>,
) -> Result<(StatusCode, Json<FanoutResponse>), (StatusCode, Json<TranslationErrorResponse>)> {
    if body.languages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            error_response("No target languages given"),
        ));
    }

    let outcome = state
        .coordinator()
        .request_translations(
            &body.source_draft_id,
            &body.languages,
            body.provider,
            body.preserve_formatting,
        )
        .await
        .map_err(map_translation_error)?;

    Ok((
        StatusCode::CREATED,
        Json(FanoutResponse {
            created: outcome
                .created
                .into_iter()
                .map(TranslationJobResponse::from)
                .collect(),
            skipped: outcome.skipped,
            unsupported: outcome.unsupported,
        }),
    ))
}

/// Get a translation job by ID
pub async fn get_translation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TranslationJobResponse>, (StatusCode, Json<TranslationErrorResponse>)> {
    match state.translation_store().get(&id) {
        Ok(Some(job)) => Ok(Json(TranslationJobResponse::from(job))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            error_response(format!("Translation job not found: {}", id)),
        )),
        Err(e) => Err(map_translation_error(e)),
    }
}

/// List a project's translation jobs
pub async fn list_project_translations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(params): Query<ListTranslationsParams>,
) -> Result<Json<ListTranslationsResponse>, (StatusCode, Json<TranslationErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = TranslationFilter::new().with_project_id(&project_id);
    if let Some(ref status) = params.status {
        let Some(status) = TranslationStatus::parse_str(status) else {
            return Err((
                StatusCode::BAD_REQUEST,
                error_response(format!("Unknown status: {}", status)),
            ));
        };
        base_filter = base_filter.with_status(status);
    }

    let query_filter = TranslationFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let translations = state
        .translation_store()
        .list(&query_filter)
        .map_err(map_translation_error)?;
    let total = state
        .translation_store()
        .count(&base_filter)
        .map_err(map_translation_error)?;

    Ok(Json(ListTranslationsResponse {
        translations: translations
            .into_iter()
            .map(TranslationJobResponse::from)
            .collect(),
        total,
        limit,
        offset,
    }))
}

/// Cancel a pending or running translation job
pub async fn cancel_translation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TranslationJobResponse>, (StatusCode, Json<TranslationErrorResponse>)> {
    let job = state
        .coordinator()
        .cancel_job(&id)
        .await
        .map_err(map_translation_error)?;
    Ok(Json(TranslationJobResponse::from(job)))
}

/// Delete a translation job, along with its result draft if any
pub async fn delete_translation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<TranslationErrorResponse>)> {
    state
        .coordinator()
        .delete_job(&id)
        .map_err(map_translation_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Declare a project's translation phase complete, advancing it to generate
pub async fn complete_translations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<StageGateResponse>, (StatusCode, Json<TranslationErrorResponse>)> {
    match state.sequencer().complete_translations(&project_id).await {
        Ok(Some(stage)) => Ok(Json(StageGateResponse {
            project_id,
            current_stage: stage.as_str().to_string(),
        })),
        Ok(None) => Err((
            StatusCode::CONFLICT,
            error_response("Project is not in the translate stage"),
        )),
        Err(ContentError::ProjectNotFound(id)) => Err((
            StatusCode::NOT_FOUND,
            error_response(format!("Project not found: {}", id)),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, error_response(e))),
    }
}
