use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{events, handlers, projects, tasks, translations};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Event log
        .route("/logs", get(events::query_events))
        // Tasks
        .route("/tasks", post(tasks::create_task))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}", delete(tasks::delete_task))
        .route("/tasks/{id}/cancel", post(tasks::cancel_task))
        .route("/tasks/{id}/retry", post(tasks::retry_task))
        .route("/tasks/{id}/heartbeat", post(tasks::heartbeat_task))
        // Translations
        .route("/translations/languages", get(translations::list_languages))
        .route("/translations", post(translations::create_translations))
        .route("/translations/{id}", get(translations::get_translation))
        .route("/translations/{id}", delete(translations::delete_translation))
        .route(
            "/translations/{id}/cancel",
            post(translations::cancel_translation),
        )
        .route(
            "/translations/project/{project_id}",
            get(translations::list_project_translations),
        )
        .route(
            "/translations/project/{project_id}/complete",
            post(translations::complete_translations),
        )
        // Projects and documents
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/projects/{id}", delete(projects::delete_project))
        .route("/projects/{id}/documents", post(projects::register_document))
        .route("/projects/{id}/documents", get(projects::list_documents))
        .route("/projects/{id}/drafts", get(projects::list_drafts))
        // Drafts
        .route("/drafts/{id}", get(projects::get_draft))
        .route("/drafts/{id}/approve", post(projects::approve_draft))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
}
