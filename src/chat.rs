//! Question answering over the active project.
//!
//! A turn embeds the question, retrieves chunks by maximal marginal
//! relevance, renders the answer prompt and asks the chat model. Failures
//! inside a turn are answered with an `Error: ...` message instead of being
//! returned, so the conversation always records both sides.

use crate::error::{AppError, AppResult};
use crate::git;
use crate::models::ChatMessage;
use crate::prompt::{commit_context, format_context, sanitize_for_prompt};
use crate::search::VectorIndex;
use crate::state::AppState;

/// Input that wipes the active project's clone instead of asking a question.
pub const CLEAR_COMMAND: &str = "clear";
pub const CLEARED_REPLY: &str = "Repository cleared.";

const MAX_MESSAGE_LEN: usize = 2000;

/// Handle one chat input and return the reply shown to the user.
pub async fn handle_message(state: &AppState, message: &str) -> AppResult<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::InvalidInput("Message is required".to_string()));
    }

    let _permit = state.begin_action().await?;

    if message.eq_ignore_ascii_case(CLEAR_COMMAND) {
        clear_active(state).await?;
        return Ok(CLEARED_REPLY.to_string());
    }

    let question = truncate_to_char_boundary(message, MAX_MESSAGE_LEN);
    let reply = match answer(state, question).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!("Chat turn failed: {e}");
            format!("Error: {e}")
        }
    };

    let mut session = state.session.write();
    session.history.push(ChatMessage::user(question));
    session.history.push(ChatMessage::assistant(reply.clone()));
    Ok(reply)
}

async fn answer(state: &AppState, question: &str) -> AppResult<String> {
    let (name, history) = {
        let session = state.session.read();
        let name = session
            .active
            .clone()
            .ok_or_else(|| AppError::NotFound("No project selected".to_string()))?;
        // A turn is one user message plus the assistant reply
        let window = state.config.history_turns.saturating_mul(2);
        let skip = session.history.len().saturating_sub(window);
        (name, session.history[skip..].to_vec())
    };
    let project = state
        .registry
        .read()
        .get(&name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Project '{name}' not found")))?;

    let query = state
        .embedder
        .embed_query(question)
        .await
        .map_err(AppError::index)?;

    let index_dir = state.config.index_path(&name);
    let index = tokio::task::spawn_blocking(move || VectorIndex::open(&index_dir))
        .await
        .map_err(|e| AppError::Index(format!("Background task failed: {e}")))?
        .map_err(AppError::index)?;

    let retrieval = &state.config.retrieval;
    let hits = index
        .query_mmr(&query, retrieval.k, retrieval.fetch_k, retrieval.mmr_lambda)
        .map_err(AppError::index)?;
    tracing::debug!("Retrieved {} of {} chunks for {name}", hits.len(), index.len());

    let commit = project
        .metadata
        .latest_commit
        .as_ref()
        .or(project.last_commit.as_ref());
    let prompt = state.prompt.render(
        &format_context(&hits),
        &sanitize_for_prompt(question),
        &commit_context(commit, &project.url),
    );

    let mut messages = history;
    messages.push(ChatMessage::user(prompt));

    state
        .model
        .complete(&messages)
        .await
        .map_err(AppError::generation)
}

/// Remove the active project's clone directory. The index and registry entry
/// stay, so the project can still be queried and later updated.
async fn clear_active(state: &AppState) -> AppResult<()> {
    let Some(name) = state.session.read().active.clone() else {
        return Ok(());
    };
    let dir = state.config.clone_path(&name);
    tokio::task::spawn_blocking(move || git::remove_dir_force(&dir))
        .await
        .map_err(|e| AppError::Registry(format!("Background task failed: {e}")))?
        .map_err(AppError::registry)?;
    tracing::info!("Cleared clone of {name}");
    Ok(())
}

fn truncate_to_char_boundary(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        assert_eq!(truncate_to_char_boundary("hello", 10), "hello");
        assert_eq!(truncate_to_char_boundary("héllo", 2), "hé");
    }
}
