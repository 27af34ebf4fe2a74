//! Model access: embeddings and answer generation.
//!
//! The rest of the crate talks to models through the [`Embedder`] and
//! [`ChatModel`] traits; the HTTP implementations below dispatch on
//! `LlmConfig::provider`.

pub mod embeddings;
pub mod generate;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed many texts; one vector per input, in order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of every vector this embedder returns.
    fn dims(&self) -> usize;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply to `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embeddings::embed_batch(&self.client, &self.config, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        embeddings::embed_single(&self.client, &self.config, text).await
    }

    fn dims(&self) -> usize {
        self.config.embedding_dim
    }
}

pub struct HttpChatModel {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpChatModel {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        generate::generate(&self.client, &self.config, messages).await
    }
}
