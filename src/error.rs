//! Error taxonomy for user actions.
//!
//! Internal helpers return `anyhow::Result`; the project lifecycle and the
//! chat engine classify failures into [`AppError`] so that every HTTP handler
//! can turn them into a user-visible message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Clone, pull or fetch failed (network, auth, invalid URL, filesystem).
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Nothing to index: no supported files or no chunks.
    #[error("{0}")]
    EmptyResult(String),

    /// Embedding, index build or index query failed.
    #[error("Index error: {0}")]
    Index(String),

    /// The language model endpoint failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The project registry could not be read or written.
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn fetch(err: anyhow::Error) -> Self {
        AppError::Fetch(format!("{err:#}"))
    }

    pub fn index(err: anyhow::Error) -> Self {
        AppError::Index(format!("{err:#}"))
    }

    pub fn generation(err: anyhow::Error) -> Self {
        AppError::Generation(format!("{err:#}"))
    }

    pub fn registry(err: anyhow::Error) -> Self {
        AppError::Registry(format!("{err:#}"))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::EmptyResult(_) => "empty_result",
            AppError::Index(_) => "index",
            AppError::Generation(_) => "generation",
            AppError::Registry(_) => "registry",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Fetch(_) | AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::EmptyResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Index(_) | AppError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), "{self}");
        let payload = json!({ "error": self.to_string(), "kind": self.kind() });
        (self.status(), Json(payload)).into_response()
    }
}
