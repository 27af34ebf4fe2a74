use axum::extract::State;
use axum::Json;

use crate::chat::handle_message;
use crate::error::AppResult;
use crate::models::{ChatRequest, SessionView, TextResponse};
use crate::state::AppState;

/// POST /api/chat - Answer a question about the active project
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> AppResult<Json<TextResponse>> {
    let response = handle_message(&state, &req.message).await?;
    Ok(Json(TextResponse { response }))
}

/// GET /api/session - Active project and conversation history
pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session_view())
}
