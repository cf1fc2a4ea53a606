//! The research pipeline: orchestration, normalization and response assembly.

use crate::arxiv::ArxivClient;
use crate::config::{DigestConfig, PipelineConfig};
use crate::error::{ConfigError, DigestError, Result};
use crate::normalizer::ResultNormalizer;
use crate::orchestration::{OrchestrationAdapter, Orchestrator, SearchStepOrchestrator};
use crate::providers::create_generator;
use crate::search::PaperSearch;
use crate::summarizer::{LlmSummarizer, Summarize};
use crate::types::SearchResponse;
use std::sync::Arc;
use tracing::info;

/// One request's worth of work, shared across handlers.
pub struct ResearchPipeline {
    adapter: OrchestrationAdapter,
    normalizer: ResultNormalizer,
    summarizer: Arc<dyn Summarize>,
    config: PipelineConfig,
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn PaperSearch>,
        orchestrator: Arc<dyn Orchestrator>,
        summarizer: Arc<dyn Summarize>,
        config: PipelineConfig,
    ) -> Self {
        let adapter = OrchestrationAdapter::new(orchestrator, search.clone())
            .with_enabled(config.orchestration_enabled)
            .with_fallback_on_error(config.fallback_on_orchestration_error);
        let normalizer = ResultNormalizer::new(search, summarizer.clone())
            .with_concurrency(config.summary_concurrency);
        Self {
            adapter,
            normalizer,
            summarizer,
            config,
        }
    }

    /// Wire the arXiv client, the configured text generator and the search-step
    /// orchestrator.
    ///
    /// Fails with `ConfigError::Invalid` for any provider other than `gemini`.
    pub fn from_config(config: &DigestConfig) -> Result<Self> {
        if config.llm.provider != "gemini" {
            return Err(ConfigError::Invalid {
                message: format!("unsupported llm.provider '{}'", config.llm.provider),
            }
            .into());
        }
        let search: Arc<dyn PaperSearch> = Arc::new(ArxivClient::new(&config.search)?);
        let generator = create_generator(&config.llm)?;
        let summarizer = Arc::new(LlmSummarizer::new(generator, config.llm.model_id()));
        let orchestrator = Arc::new(SearchStepOrchestrator::new(search.clone()));
        Ok(Self::new(
            search,
            orchestrator,
            summarizer,
            config.pipeline.clone(),
        ))
    }

    /// The `top_n` actually used for a request.
    pub fn effective_top_n(&self, requested: Option<u32>) -> u32 {
        self.config.effective_top_n(requested)
    }

    /// Run the pipeline for a topic. The topic is trimmed and must not be empty.
    pub async fn run(&self, topic: &str, top_n: Option<u32>) -> Result<SearchResponse> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DigestError::InvalidRequest {
                message: "Topic must not be empty".to_string(),
            });
        }
        let top_n = self.effective_top_n(top_n);
        info!(topic, top_n, "Starting research pipeline");

        let raw = self.adapter.run(topic, top_n).await?;
        let papers = self.normalizer.normalize(raw, topic, top_n).await;

        info!(topic, papers = papers.len(), "Research pipeline finished");
        Ok(SearchResponse {
            topic: topic.to_string(),
            model: self.summarizer.model_name().to_string(),
            papers,
        })
    }
}
