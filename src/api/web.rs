//! Single-repository flow used by the chat page: submit a URL, then ask.

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::Deserialize;

use crate::api::projects::check_remote_url;
use crate::chat::handle_message;
use crate::error::AppResult;
use crate::models::TextResponse;
use crate::projects::ingest_url;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestForm {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub msg: String,
}

/// GET / - Chat page
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// POST /chatbot - Clone, index and select the repository at `question`
pub async fn ingest(
    State(state): State<AppState>,
    Form(form): Form<IngestForm>,
) -> AppResult<Json<TextResponse>> {
    let url = form.question.trim();
    check_remote_url(url)?;
    ingest_url(&state, url).await?;
    Ok(Json(TextResponse {
        response: url.to_string(),
    }))
}

/// POST /get - Answer `msg` as plain text
pub async fn answer_form(
    State(state): State<AppState>,
    Form(form): Form<MessageForm>,
) -> (StatusCode, String) {
    answer_text(&state, &form.msg).await
}

/// GET /get?msg=... - Answer `msg` as plain text
pub async fn answer_query(
    State(state): State<AppState>,
    Query(form): Query<MessageForm>,
) -> (StatusCode, String) {
    answer_text(&state, &form.msg).await
}

async fn answer_text(state: &AppState, msg: &str) -> (StatusCode, String) {
    match handle_message(state, msg).await {
        Ok(reply) => (StatusCode::OK, reply),
        Err(e) => (e.status(), format!("Error: {e}")),
    }
}
