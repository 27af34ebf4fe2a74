use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::SemaphorePermit;

use crate::chunking::Chunker;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::llm::{ChatModel, Embedder, HttpChatModel, HttpEmbedder};
use crate::loader::LanguageRegistry;
use crate::models::{ChatMessage, SessionView};
use crate::prompt::PromptTemplate;
use crate::registry::Registry;

/// The active project and the conversation so far.
#[derive(Debug, Default)]
pub struct Session {
    pub active: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl Session {
    pub fn view(&self) -> SessionView {
        SessionView {
            active: self.active.clone(),
            history: self.history.clone(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<RwLock<Registry>>,
    pub session: Arc<RwLock<Session>>,
    pub languages: Arc<LanguageRegistry>,
    pub chunker: Chunker,
    pub prompt: Arc<PromptTemplate>,
    pub embedder: Arc<dyn Embedder>,
    pub model: Arc<dyn ChatModel>,
    pub http_client: reqwest::Client,
    /// Serializes user actions: one add/update/delete/select/chat at a time.
    pub action_permit: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder = Arc::new(HttpEmbedder::new(http_client.clone(), config.llm.clone()));
        let model = Arc::new(HttpChatModel::new(http_client.clone(), config.llm.clone()));
        Self::with_models(config, http_client, embedder, model)
    }

    /// Build state around caller-supplied models.
    pub fn with_models(
        config: Config,
        http_client: reqwest::Client,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
    ) -> anyhow::Result<Self> {
        // Ensure data directories exist
        std::fs::create_dir_all(config.repos_dir())?;
        std::fs::create_dir_all(config.index_dir())?;

        let registry = Registry::load(&config.registry_path())?;
        tracing::info!("Loaded {} projects", registry.len());

        let prompt = PromptTemplate::load(config.prompt_template_path.as_deref())?;

        if embedder.dims() != config.llm.embedding_dim {
            anyhow::bail!(
                "Embedder produces {}-dimensional vectors but {} are configured",
                embedder.dims(),
                config.llm.embedding_dim
            );
        }

        Ok(Self {
            chunker: Chunker::from_config(&config.chunking),
            config,
            registry: Arc::new(RwLock::new(registry)),
            session: Arc::new(RwLock::new(Session::default())),
            languages: Arc::new(LanguageRegistry::default()),
            prompt: Arc::new(prompt),
            embedder,
            model,
            http_client,
            action_permit: Arc::new(tokio::sync::Semaphore::new(1)),
        })
    }

    /// Wait for the action permit. Hold the returned guard for the whole action.
    pub async fn begin_action(&self) -> AppResult<SemaphorePermit<'_>> {
        self.action_permit
            .acquire()
            .await
            .map_err(|_| AppError::Registry("Action queue is closed".to_string()))
    }

    pub fn session_view(&self) -> SessionView {
        self.session.read().view()
    }
}
