//! Project lifecycle: add, check for updates, update, delete, select.
//!
//! Every public action takes the action permit for its whole duration.
//! Blocking git and filesystem work runs on the blocking pool; registry and
//! session locks are only held between awaits.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::git::{self, metadata::fetch_repo_metadata};
use crate::llm::embeddings::document_text;
use crate::loader::{load_documents, LoadSummary};
use crate::models::{CommitInfo, Project, RepoMetadata, SessionView, UpdateResponse, UpdateStatus};
use crate::search::{IndexedRecord, VectorIndex};
use crate::state::AppState;

/// Result of adding or re-ingesting a project.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub name: String,
    pub project: Project,
    pub load: LoadSummary,
}

/// What one pass of load → chunk → embed → index produced.
#[derive(Debug, Clone)]
struct IndexStats {
    files: usize,
    chunks: usize,
    load: LoadSummary,
}

/// Project names become directory names, so they must be a single path segment.
pub fn validate_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Project name is required".to_string()));
    }
    if trimmed != name {
        return Err(AppError::InvalidInput(
            "Project name must not start or end with whitespace".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(AppError::InvalidInput(format!("Invalid project name: {name}")));
    }
    Ok(())
}

/// Derive a project name from the last path segment of a repository URL.
pub fn name_from_url(url: &str) -> Option<String> {
    let name = url
        .trim()
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?
        .trim_end_matches(".git");
    validate_name(name).ok()?;
    Some(name.to_string())
}

/// Clone `url` as project `name` and index it. An existing project with the
/// same name is replaced.
pub async fn add_project(
    state: &AppState,
    url: &str,
    name: &str,
    token: Option<String>,
) -> AppResult<IngestOutcome> {
    let _permit = state.begin_action().await?;
    add_locked(state, url, name, token).await
}

/// Minimal flow: name the project after the URL, add it and make it active.
pub async fn ingest_url(state: &AppState, url: &str) -> AppResult<IngestOutcome> {
    let name = name_from_url(url)
        .ok_or_else(|| AppError::InvalidInput(format!("Cannot derive a project name from {url}")))?;

    let _permit = state.begin_action().await?;
    let outcome = add_locked(state, url, &name, None).await?;
    select_locked(state, &name)?;
    Ok(outcome)
}

/// Compare the clone's HEAD with the remote without changing anything.
pub async fn check_updates(
    state: &AppState,
    name: &str,
    token: Option<String>,
) -> AppResult<UpdateResponse> {
    let _permit = state.begin_action().await?;
    require_project(state, name)?;

    let token = resolve_token(state, token);
    let dir = state.config.clone_path(name);

    // Update clones a missing checkout again, so report it as pending work
    if !dir.join(".git").exists() {
        return Ok(UpdateResponse {
            status: UpdateStatus::UpdatesAvailable,
            message: UpdateStatus::UpdatesAvailable.describe(),
            local: None,
            remote: None,
            project: None,
        });
    }

    let status = run_blocking(move || git::check_for_updates(&dir, token.as_deref()))
        .await
        .map_err(AppError::fetch)?;

    let update_status = if status.has_updates() {
        UpdateStatus::UpdatesAvailable
    } else {
        UpdateStatus::UpToDate
    };
    Ok(UpdateResponse {
        status: update_status,
        message: update_status.describe(),
        local: Some(status.local),
        remote: Some(status.remote),
        project: None,
    })
}

/// Pull and fully re-ingest a project when its remote has moved.
///
/// An up-to-date project is left exactly as it was. A project whose clone is
/// missing (for example after `clear`) is cloned again and re-ingested.
pub async fn update_project(
    state: &AppState,
    name: &str,
    token: Option<String>,
) -> AppResult<UpdateResponse> {
    let _permit = state.begin_action().await?;
    let existing = require_project(state, name)?;

    let token = resolve_token(state, token);
    let dir = state.config.clone_path(name);

    let (local, remote) = if dir.join(".git").exists() {
        let check_dir = dir.clone();
        let check_token = token.clone();
        let status = run_blocking(move || git::check_for_updates(&check_dir, check_token.as_deref()))
            .await
            .map_err(AppError::fetch)?;

        if !status.has_updates() {
            tracing::info!("{name} is up to date at {}", status.local);
            return Ok(UpdateResponse {
                status: UpdateStatus::UpToDate,
                message: UpdateStatus::UpToDate.describe(),
                local: Some(status.local),
                remote: Some(status.remote),
                project: Some(existing),
            });
        }

        let pull_dir = dir.clone();
        let pull_token = token.clone();
        let head = run_blocking(move || git::pull_repo(&pull_dir, pull_token.as_deref()))
            .await
            .map_err(AppError::fetch)?;
        (Some(status.local), Some(head))
    } else {
        tracing::info!("Clone of {name} is missing, cloning again");
        clone(state, &existing.url, name, token.clone()).await?;
        (None, None)
    };

    let metadata = fetch_metadata(state, &existing.url, token.as_deref()).await;
    let stats = index_clone(state, name, &dir).await?;
    let last_commit = read_last_commit(&dir).await;

    let project = Project {
        url: existing.url,
        added: existing.added,
        last_updated: Utc::now(),
        last_commit,
        chunks: stats.chunks,
        files: stats.files,
        metadata,
    };
    record(state, name, project.clone())?;

    tracing::info!("Updated {name}: {} files, {} chunks", stats.files, stats.chunks);
    Ok(UpdateResponse {
        status: UpdateStatus::Updated,
        message: UpdateStatus::Updated.describe(),
        local,
        remote,
        project: Some(project),
    })
}

/// Remove a project's clone, index and registry entry.
pub async fn delete_project(state: &AppState, name: &str) -> AppResult<()> {
    let _permit = state.begin_action().await?;
    require_project(state, name)?;

    let clone_dir = state.config.clone_path(name);
    let index_dir = state.config.index_path(name);
    run_blocking(move || {
        git::remove_dir_force(&clone_dir)?;
        git::remove_dir_force(&index_dir)
    })
    .await
    .map_err(AppError::registry)?;

    {
        let mut registry = state.registry.write();
        registry.remove(name);
        registry.persist().map_err(AppError::registry)?;
    }

    let mut session = state.session.write();
    if session.active.as_deref() == Some(name) {
        session.active = None;
        session.history.clear();
    }

    tracing::info!("Deleted project {name}");
    Ok(())
}

/// Make `name` the active project and start a fresh conversation.
pub async fn select_project(state: &AppState, name: &str) -> AppResult<SessionView> {
    let _permit = state.begin_action().await?;
    select_locked(state, name)?;
    Ok(state.session_view())
}

fn select_locked(state: &AppState, name: &str) -> AppResult<()> {
    require_project(state, name)?;
    let mut session = state.session.write();
    session.active = Some(name.to_string());
    session.history.clear();
    tracing::info!("Selected project {name}");
    Ok(())
}

async fn add_locked(
    state: &AppState,
    url: &str,
    name: &str,
    token: Option<String>,
) -> AppResult<IngestOutcome> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::InvalidInput("Repository URL is required".to_string()));
    }
    validate_name(name)?;

    {
        let registry = state.registry.read();
        if !registry.contains(name) && registry.len() >= state.config.max_projects {
            return Err(AppError::InvalidInput(format!(
                "Maximum number of projects ({}) reached",
                state.config.max_projects
            )));
        }
    }

    let token = resolve_token(state, token);
    clone(state, url, name, token.clone()).await?;

    let metadata = fetch_metadata(state, url, token.as_deref()).await;
    let dir = state.config.clone_path(name);
    let stats = index_clone(state, name, &dir).await?;
    let last_commit = read_last_commit(&dir).await;

    let now = Utc::now();
    let project = Project {
        url: url.to_string(),
        added: now,
        last_updated: now,
        last_commit,
        chunks: stats.chunks,
        files: stats.files,
        metadata,
    };
    record(state, name, project.clone())?;

    tracing::info!(
        "Project {name} is ready: {} files, {} chunks",
        stats.files,
        stats.chunks
    );
    Ok(IngestOutcome {
        name: name.to_string(),
        project,
        load: stats.load,
    })
}

async fn clone(state: &AppState, url: &str, name: &str, token: Option<String>) -> AppResult<()> {
    let url = url.to_string();
    let dir = state.config.clone_path(name);
    run_blocking(move || git::clone_repo(&url, &dir, token.as_deref()))
        .await
        .map_err(AppError::fetch)
}

/// Load, chunk, embed and index a clone, replacing the project's index.
async fn index_clone(state: &AppState, name: &str, dir: &Path) -> AppResult<IndexStats> {
    let root: PathBuf = dir.to_path_buf();
    let languages = state.languages.clone();
    let chunker = state.chunker.clone();
    let max_file_bytes = state.config.max_file_bytes;

    let (files, chunks, load) = run_blocking(move || {
        let (docs, report) = load_documents(&root, &languages, max_file_bytes);
        let chunks = chunker.chunk_documents(&docs);
        Ok((docs.len(), chunks, report.summary()))
    })
    .await
    .map_err(AppError::index)?;

    tracing::info!(
        "Loaded {name}: {} files, {} unsupported, {} failed",
        load.loaded,
        load.unsupported,
        load.failed
    );
    for failure in &load.failures {
        tracing::debug!("Load failure in {name}: {failure}");
    }

    if files == 0 {
        return Err(AppError::EmptyResult(
            "No code files found in repository".to_string(),
        ));
    }
    if chunks.is_empty() {
        return Err(AppError::EmptyResult(
            "No content to index: every file is empty".to_string(),
        ));
    }
    tracing::info!("Created {} chunks for {name}", chunks.len());

    let texts: Vec<String> = chunks.iter().map(document_text).collect();
    let vectors = state
        .embedder
        .embed_documents(&texts)
        .await
        .map_err(AppError::index)?;
    if vectors.len() != chunks.len() {
        return Err(AppError::Index(format!(
            "Embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let chunk_count = chunks.len();
    let records: Vec<IndexedRecord> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexedRecord::new(chunk, vector))
        .collect();

    let index_dir = state.config.index_path(name);
    let dims = state.embedder.dims();
    run_blocking(move || VectorIndex::build(&index_dir, dims, records).map(|_| ()))
        .await
        .map_err(AppError::index)?;

    Ok(IndexStats {
        files,
        chunks: chunk_count,
        load,
    })
}

async fn fetch_metadata(state: &AppState, url: &str, token: Option<&str>) -> RepoMetadata {
    fetch_repo_metadata(&state.http_client, &state.config.github_api_url, url, token).await
}

async fn read_last_commit(dir: &Path) -> Option<CommitInfo> {
    let dir = dir.to_path_buf();
    match run_blocking(move || git::last_commit(&dir)).await {
        Ok(commit) => Some(commit),
        Err(e) => {
            tracing::warn!("Could not read HEAD commit: {e:#}");
            None
        }
    }
}

fn record(state: &AppState, name: &str, project: Project) -> AppResult<()> {
    let mut registry = state.registry.write();
    registry.upsert(name, project);
    registry.persist().map_err(AppError::registry)
}

fn require_project(state: &AppState, name: &str) -> AppResult<Project> {
    state
        .registry
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Project '{name}' not found")))
}

fn resolve_token(state: &AppState, token: Option<String>) -> Option<String> {
    token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| state.config.git_token.clone())
}

/// Run blocking work on the blocking pool, folding a panicked task into the error.
async fn run_blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("Background task failed: {e}"))?
}
