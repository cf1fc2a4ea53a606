//! # paperdigest Core
//!
//! Core library for paperdigest.
//! Provides arXiv paper search, Gemini-backed structured summaries, the
//! orchestration adapter and result normalizer, the research pipeline,
//! configuration, and the REST gateway.

pub mod arxiv;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod orchestration;
pub mod pipeline;
pub mod providers;
pub mod search;
pub mod summarizer;
pub mod types;

// Re-export commonly used types at the crate root.
pub use arxiv::ArxivClient;
pub use config::{load_config, DigestConfig};
pub use error::{DigestError, Result};
pub use normalizer::ResultNormalizer;
pub use orchestration::{
    OrchestrationAdapter, OrchestrationOutput, Orchestrator, Payload, SearchStepOrchestrator,
};
pub use pipeline::ResearchPipeline;
pub use providers::{GeminiProvider, MockTextGenerator, TextGenerator};
pub use search::PaperSearch;
pub use summarizer::{LlmSummarizer, Summarize};
pub use types::{EnrichedPaper, PaperRecord, SearchResponse, SummaryRecord};
