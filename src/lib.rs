//! # repo-chat
//!
//! A Rust web application for chatting with git repositories. Each named
//! project is cloned, split into code-aware chunks, embedded and stored in
//! its own vector index; questions are answered by a language model from
//! the chunks retrieved for them.
//!
//! ## Architecture
//!
//! ```text
//!   Ingestion                                   Question
//!   ─────────                                   ────────
//!   clone / pull (git2)                         embed query
//!          │                                         │
//!          ▼                                         ▼
//!   load files (LanguageRegistry)               MMR retrieval
//!          │                                    top 20 → pick 8
//!          ▼                                         │
//!   chunk: syntax │ separators │ plain               ▼
//!   2000 chars, 200 overlap                     render prompt
//!          │                                    context + commit info
//!          ▼                                         │
//!   embed "File: <path>\n<chunk>"                    ▼
//!          │                                    chat model
//!          ▼                                         │
//!   data/db/<name>/vectors.json  ───────────────────►┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dirs, models and retrieval
//! - [`error`] - `AppError`, the user-facing failure taxonomy
//! - [`models`] - Shared data types: `Project`, `CommitInfo`, `RepoMetadata`, request/response types
//! - [`git`] - Clone, pull, update checks, commit info and GitHub metadata
//! - [`loader`] - Repository walking and the extension → language registry
//! - [`chunking`] - Syntax-aware, separator-based and plain-text chunking
//! - [`llm`] - Embedding and chat model clients for Ollama, OpenAI and Hugging Face
//! - [`search`] - Per-project vector index with maximal-marginal-relevance retrieval
//! - [`prompt`] - The versioned answer prompt template
//! - [`registry`] - The persisted name → project map
//! - [`projects`] - Project lifecycle actions
//! - [`chat`] - Chat turns and the `clear` command
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod chat;
pub mod chunking;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod loader;
pub mod models;
pub mod projects;
pub mod prompt;
pub mod registry;
pub mod search;
pub mod state;
