use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunking::Chunk;
use crate::config::LlmConfig;

/// Maximum characters to send per text to the embedding API.
/// Small embedding models have short contexts; dense content (JSON blobs,
/// minified JS) can run above two tokens per character.
const MAX_EMBED_CHARS: usize = 3_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS` characters.
pub fn truncate_for_embedding(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBED_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Text sent to the embedder for a chunk: the file path gives the model
/// context the chunk itself often lacks.
pub fn document_text(chunk: &Chunk) -> String {
    format!("File: {}\n{}", chunk.source, chunk.text)
}

/// Generate embeddings for a batch of texts using the configured provider.
/// Every vector is checked against `config.embedding_dim`.
pub async fn embed_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let truncated: Vec<String> = texts
        .iter()
        .map(|t| truncate_for_embedding(t).to_string())
        .collect();

    let embeddings = match config.provider.as_str() {
        "ollama" => embed_ollama(client, config, &truncated).await?,
        "openai" => embed_openai(client, config, &truncated).await?,
        "huggingface" => embed_huggingface(client, config, &truncated).await?,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    };

    check_embeddings(&embeddings, texts.len(), config.embedding_dim)?;
    Ok(embeddings)
}

/// Generate embedding for a single text.
pub async fn embed_single(
    client: &reqwest::Client,
    config: &LlmConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let results = embed_batch(client, config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .context("No embedding returned")
}

fn check_embeddings(embeddings: &[Vec<f32>], expected_count: usize, dim: usize) -> Result<()> {
    if embeddings.len() != expected_count {
        anyhow::bail!(
            "Embedding API returned {} vectors for {expected_count} inputs",
            embeddings.len()
        );
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
        anyhow::bail!(
            "Embedding dimension mismatch: expected {dim}, got {}",
            bad.len()
        );
    }
    Ok(())
}

async fn post_json<Req: Serialize, Resp: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    body: &Req,
    provider: &str,
) -> Result<Resp> {
    let mut req = client.post(url).json(body);
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        req = req.header("Authorization", format!("Bearer {key}"));
    }

    let resp = req
        .send()
        .await
        .with_context(|| format!("Failed to call {provider} embed API"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("{provider} embed API returned {status}: {body}");
    }

    resp.json()
        .await
        .with_context(|| format!("Failed to parse {provider} embed response"))
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    /// Ask Ollama to truncate inputs that exceed the model's context length
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/api/embed", config.embeddings_base_url());

    let batch_size = 32;
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let req = OllamaEmbedRequest {
            model: &config.embedding_model,
            input: chunk,
            truncate: true,
        };
        let body: OllamaEmbedResponse = post_json(client, &url, None, &req, "Ollama").await?;
        all_embeddings.extend(body.embeddings);
    }

    Ok(all_embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/v1/embeddings", config.embeddings_base_url());

    let batch_size = 64;
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let req = OpenAiEmbedRequest {
            model: &config.embedding_model,
            input: chunk,
        };
        let body: OpenAiEmbedResponse =
            post_json(client, &url, config.api_key.as_deref(), &req, "OpenAI").await?;
        all_embeddings.extend(body.data.into_iter().map(|d| d.embedding));
    }

    Ok(all_embeddings)
}

// ─── Hugging Face inference ──────────────────────────────

#[derive(Serialize)]
struct HfEmbedRequest<'a> {
    inputs: &'a [String],
    options: HfOptions,
}

#[derive(Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

async fn embed_huggingface(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = format!(
        "{}/models/{}/pipeline/feature-extraction",
        config.embeddings_base_url(),
        config.embedding_model
    );

    let batch_size = 32;
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size) {
        let req = HfEmbedRequest {
            inputs: chunk,
            options: HfOptions {
                wait_for_model: true,
            },
        };
        let body: Vec<Vec<f32>> =
            post_json(client, &url, config.api_key.as_deref(), &req, "Hugging Face").await?;
        all_embeddings.extend(body);
    }

    Ok(all_embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, base_url: String, dim: usize) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            base_url,
            embedding_dim: dim,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        let short = "fn main() {}";
        assert_eq!(truncate_for_embedding(short), short);

        let long = "é".repeat(MAX_EMBED_CHARS + 10);
        let cut = truncate_for_embedding(&long);
        assert_eq!(cut.chars().count(), MAX_EMBED_CHARS);
    }

    #[test]
    fn test_document_text_prefixes_path() {
        let chunk = Chunk {
            source: "src/app.py".into(),
            language: "python".into(),
            ordinal: 0,
            offset: 0,
            start_line: 1,
            end_line: 1,
            text: "print(1)".into(),
        };
        assert_eq!(document_text(&chunk), "File: src/app.py\nprint(1)");
    }

    #[tokio::test]
    async fn test_ollama_embed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embed")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"model": "all-minilm", "input": ["a", "b"]}),
            ))
            .with_status(200)
            .with_body(r#"{"embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let cfg = config("ollama", server.url(), 3);
        let out = embed_batch(&client, &cfg, &["a".into(), "b".into()]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec![0.4, 0.5, 0.6]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_body(r#"{"embeddings": [[0.1, 0.2]]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let cfg = config("ollama", server.url(), 384);
        let err = embed_single(&client, &cfg, "query").await.unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn test_openai_embed_sends_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [1.0, 0.0]}]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let mut cfg = config("openai", server.url(), 2);
        cfg.api_key = Some("sk-test".into());
        let out = embed_single(&client, &cfg, "hello").await.unwrap();
        assert_eq!(out, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_huggingface_embed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/all-minilm/pipeline/feature-extraction")
            .with_status(200)
            .with_body("[[0.5, 0.5]]")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let cfg = config("huggingface", server.url(), 2);
        let out = embed_single(&client, &cfg, "hello").await.unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_embeddings_use_their_own_base_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/all-minilm/pipeline/feature-extraction")
            .with_status(200)
            .with_body("[[0.5, 0.5]]")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        // Chat traffic would go to an unreachable host
        let mut cfg = config("huggingface", "http://127.0.0.1:9".into(), 2);
        cfg.embedding_base_url = Some(server.url());
        let out = embed_single(&client, &cfg, "hello").await.unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(500)
            .with_body("model not loaded")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let cfg = config("ollama", server.url(), 3);
        let err = embed_single(&client, &cfg, "x").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let client = reqwest::Client::new();
        let cfg = config("nope", "http://127.0.0.1:9".into(), 3);
        assert!(embed_single(&client, &cfg, "x").await.is_err());
    }
}
