use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::models::{
    AddProjectRequest, ProjectPanel, ProjectSummary, SessionView, UpdateProjectRequest,
    UpdateResponse,
};
use crate::projects::{self, IngestOutcome};
use crate::state::AppState;

/// GET /api/projects - List all projects in name order
pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<ProjectSummary>> {
    let active = state.session.read().active.clone();
    let registry = state.registry.read();
    let projects = registry
        .list()
        .map(|(name, project)| ProjectSummary {
            name: name.clone(),
            project: project.clone(),
            active: active.as_deref() == Some(name.as_str()),
        })
        .collect();
    Json(projects)
}

/// POST /api/projects - Clone and index a repository under a name
pub async fn add_project(
    State(state): State<AppState>,
    Json(req): Json<AddProjectRequest>,
) -> AppResult<(StatusCode, Json<IngestOutcome>)> {
    let url = req.url.trim();
    check_remote_url(url)?;
    let outcome = projects::add_project(&state, url, req.name.trim(), req.token).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/projects/{name} - Project information panel
pub async fn get_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ProjectPanel>> {
    let registry = state.registry.read();
    let project = registry
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("Project '{name}' not found")))?;
    Ok(Json(ProjectPanel::new(&name, project)))
}

/// DELETE /api/projects/{name} - Remove a project and its data
pub async fn delete_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    projects::delete_project(&state, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/{name}/updates?token=... - Compare the clone with its remote
pub async fn check_updates(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(req): Query<UpdateProjectRequest>,
) -> AppResult<Json<UpdateResponse>> {
    Ok(Json(projects::check_updates(&state, &name, req.token).await?))
}

/// POST /api/projects/{name}/update - Pull and re-index when the remote moved.
/// The body (`{"token": ...}`) is optional.
pub async fn update_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> AppResult<Json<UpdateResponse>> {
    let req: UpdateProjectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpdateProjectRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {e}")))?
    };
    Ok(Json(projects::update_project(&state, &name, req.token).await?))
}

/// POST /api/projects/{name}/select - Make a project active
pub async fn select_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<SessionView>> {
    Ok(Json(projects::select_project(&state, &name).await?))
}

/// Only allow remote URLs so requests cannot read local paths on the server.
pub fn check_remote_url(url: &str) -> AppResult<()> {
    if url.is_empty() {
        return Err(AppError::InvalidInput("URL is required".to_string()));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") && !url.starts_with("git://") {
        return Err(AppError::InvalidInput(
            "Only https://, http://, and git:// URLs are allowed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_remote_url() {
        assert!(check_remote_url("https://github.com/acme/demo").is_ok());
        assert!(check_remote_url("git://example.com/demo.git").is_ok());
        assert!(check_remote_url("").is_err());
        assert!(check_remote_url("/etc").is_err());
        assert!(check_remote_url("file:///etc").is_err());
    }
}
