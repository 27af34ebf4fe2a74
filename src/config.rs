use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where clones, indexes and the project registry are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Chunking parameters
    pub chunking: ChunkingConfig,
    /// Retrieval parameters
    pub retrieval: RetrievalConfig,
    /// Maximum number of projects allowed
    pub max_projects: usize,
    /// Files larger than this are not loaded
    pub max_file_bytes: u64,
    /// Git personal access token used when a request does not carry one
    pub git_token: Option<String>,
    /// Base URL of the repository metadata API
    pub github_api_url: String,
    /// Optional path to a prompt template overriding the built-in one
    pub prompt_template_path: Option<PathBuf>,
    /// Number of previous question/answer turns sent along with a question
    pub history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama", "openai" or "huggingface"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Base URL for embedding requests when they are served elsewhere
    #[serde(default)]
    pub embedding_base_url: Option<String>,
    /// Model name for answers
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for hosted providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks handed to the prompt
    pub k: usize,
    /// Candidates considered by maximal-marginal-relevance selection
    pub fetch_k: usize,
    /// 1.0 = pure relevance, 0.0 = pure diversity
    pub mmr_lambda: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8080".to_string(),
            llm: LlmConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            max_projects: 50,
            max_file_bytes: 1_048_576,
            git_token: None,
            github_api_url: "https://api.github.com".to_string(),
            prompt_template_path: None,
            history_turns: 6,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            embedding_base_url: None,
            chat_model: "mistral".to_string(),
            embedding_model: "all-minilm".to_string(),
            api_key: None,
            embedding_dim: 384,
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 8,
            fetch_k: 20,
            mmr_lambda: 0.5,
        }
    }
}

impl LlmConfig {
    /// Where embedding requests go: `embedding_base_url`, else `base_url`.
    pub fn embeddings_base_url(&self) -> &str {
        self.embedding_base_url.as_deref().unwrap_or(&self.base_url)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("REPO_CHAT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("REPO_CHAT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var("LLM_EMBEDDING_BASE_URL") {
            config.llm.embedding_base_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        parse_env("LLM_EMBEDDING_DIM", &mut config.llm.embedding_dim);
        parse_env("LLM_TEMPERATURE", &mut config.llm.temperature);
        parse_env("LLM_MAX_TOKENS", &mut config.llm.max_tokens);

        parse_env("REPO_CHAT_CHUNK_SIZE", &mut config.chunking.chunk_size);
        parse_env("REPO_CHAT_CHUNK_OVERLAP", &mut config.chunking.chunk_overlap);
        parse_env("REPO_CHAT_RETRIEVAL_K", &mut config.retrieval.k);
        parse_env("REPO_CHAT_FETCH_K", &mut config.retrieval.fetch_k);
        parse_env("REPO_CHAT_MMR_LAMBDA", &mut config.retrieval.mmr_lambda);
        parse_env("REPO_CHAT_MAX_PROJECTS", &mut config.max_projects);
        parse_env("REPO_CHAT_MAX_FILE_BYTES", &mut config.max_file_bytes);
        parse_env("REPO_CHAT_HISTORY_TURNS", &mut config.history_turns);

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            config.git_token = Some(token);
        }
        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.github_api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(path) = std::env::var("REPO_CHAT_PROMPT_TEMPLATE") {
            config.prompt_template_path = Some(PathBuf::from(path));
        }

        // Overlap must leave room for new content in every window
        if config.chunking.chunk_overlap >= config.chunking.chunk_size {
            tracing::warn!(
                "Chunk overlap {} >= chunk size {}, clamping",
                config.chunking.chunk_overlap,
                config.chunking.chunk_size
            );
            config.chunking.chunk_overlap = config.chunking.chunk_size / 10;
        }
        config.retrieval.fetch_k = config.retrieval.fetch_k.max(config.retrieval.k);
        config.retrieval.mmr_lambda = config.retrieval.mmr_lambda.clamp(0.0, 1.0);

        config
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("projects.json")
    }

    /// Working directory holding the clone of `project`.
    pub fn clone_path(&self, project: &str) -> PathBuf {
        self.repos_dir().join(project)
    }

    /// Directory holding the persisted vector index of `project`.
    pub fn index_path(&self, project: &str) -> PathBuf {
        self.index_dir().join(project)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("Ignoring unparsable {key}={val}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_ingestion_constants() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 2000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.k, 8);
        assert_eq!(config.llm.embedding_dim, 384);
    }

    #[test]
    fn test_embeddings_base_url_falls_back_to_base_url() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.embeddings_base_url(), "http://localhost:11434");
        llm.embedding_base_url = Some("https://api-inference.huggingface.co".to_string());
        assert_eq!(llm.embeddings_base_url(), "https://api-inference.huggingface.co");
    }

    #[test]
    fn test_project_paths_are_named_by_project() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/rc"),
            ..Config::default()
        };
        assert_eq!(config.clone_path("demo"), PathBuf::from("/tmp/rc/repos/demo"));
        assert_eq!(config.index_path("demo"), PathBuf::from("/tmp/rc/db/demo"));
        assert_eq!(config.registry_path(), PathBuf::from("/tmp/rc/projects.json"));
    }
}
