//! Pipeline event log query endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use bindery_core::events::{EventFilter, EventRecord};

use crate::state::AppState;

/// Maximum allowed limit for event queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for event queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the event log endpoint
#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    /// Filter by task ID
    pub task_id: Option<String>,
    /// Filter by project ID
    pub project_id: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Events at or after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for the event log endpoint
#[derive(Debug, Serialize)]
pub struct EventQueryResponse {
    pub events: Vec<EventRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct EventErrorResponse {
    pub error: String,
}

/// Query the pipeline event log
pub async fn query_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventQueryParams>,
) -> Result<Json<EventQueryResponse>, (StatusCode, Json<EventErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = EventFilter::new();
    if let Some(ref task_id) = params.task_id {
        base_filter = base_filter.with_task_id(task_id);
    }
    if let Some(ref project_id) = params.project_id {
        base_filter = base_filter.with_project_id(project_id);
    }
    if let Some(ref event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }
    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = EventFilter {
        limit,
        offset,
        ..base_filter.clone()
    };

    let events = state.event_store().query(&query_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(EventErrorResponse {
                error: format!("Failed to query events: {}", e),
            }),
        )
    })?;

    let total = state.event_store().count(&base_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(EventErrorResponse {
                error: format!("Failed to count events: {}", e),
            }),
        )
    })?;

    Ok(Json(EventQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
