pub mod chat;
pub mod projects;
pub mod web;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Request bodies are small JSON or form payloads.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// All HTTP routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::index))
        .route("/chatbot", post(web::ingest))
        .route("/get", get(web::answer_query).post(web::answer_form))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::add_project),
        )
        .route(
            "/api/projects/{name}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/api/projects/{name}/updates", get(projects::check_updates))
        .route("/api/projects/{name}/update", post(projects::update_project))
        .route("/api/projects/{name}/select", post(projects::select_project))
        .route("/api/session", get(chat::get_session))
        .route("/api/chat", post(chat::chat))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
