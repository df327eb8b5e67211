use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::AppConfig;
use crate::docs::chunker::Chunker;
use crate::docs::ingest::Ingestor;
use crate::docs::LocalIndex;
use crate::llm::LlmClient;
use crate::rag::{RagService, Retriever};

/// Gateways and services shared by every command that talks to the model or
/// the index. Built once from the loaded config.
pub struct AppState {
    pub config: AppConfig,
    pub index: Arc<LocalIndex>,
    pub llm: Arc<LlmClient>,
    pub rag: RagService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        config.require_api_key()?;

        let index = Arc::new(LocalIndex::open(&config.index.data_dir, &config.index.namespace).await?);
        let llm = Arc::new(LlmClient::new(&config.llm)?);
        info!(model = %config.llm.model, embedding_model = %config.llm.embedding_model, "LLM client initialized");

        let retriever = Retriever::new(llm.clone(), index.clone());
        let rag = RagService::new(retriever, llm.clone(), config.retrieval.top_k);

        Ok(Self {
            config,
            index,
            llm,
            rag,
        })
    }

    pub fn ingestor(&self) -> Ingestor<'_> {
        Ingestor {
            embedder: self.llm.as_ref(),
            index: self.index.as_ref(),
            chunker: Chunker::from(self.config.chunking),
        }
    }
}
