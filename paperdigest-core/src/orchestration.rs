//! The orchestration step and its adapter.
//!
//! An `Orchestrator` turns a topic into papers in whatever shape it likes; the
//! result is captured as an `OrchestrationOutput` without interpretation. The
//! `OrchestrationAdapter` runs the orchestrator and, when it fails, falls back to
//! a direct paper search.

use crate::error::OrchestrationError;
use crate::search::{records_to_values, PaperSearch};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload carried inside a wrapper object's `raw` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    RawText(String),
    RecordList(Vec<Value>),
}

/// Every result shape an orchestration step can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationOutput {
    /// JSON text expected to hold an array of records.
    RawText(String),
    /// Already-parsed records.
    RecordList(Vec<Value>),
    /// An object wrapping its payload in a `raw` field.
    Wrapper(Payload),
    /// Anything else; `kind` describes what was seen.
    Unrecognized { kind: String },
}

impl OrchestrationOutput {
    /// Classify an arbitrary JSON value produced by an external orchestrator.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::RawText(s),
            Value::Array(items) => Self::RecordList(items),
            Value::Object(mut obj) => match obj.remove("raw") {
                Some(Value::String(s)) => Self::Wrapper(Payload::RawText(s)),
                Some(Value::Array(items)) => Self::Wrapper(Payload::RecordList(items)),
                Some(other) => Self::Unrecognized {
                    kind: format!("object with {} raw field", json_kind(&other)),
                },
                None => Self::Unrecognized {
                    kind: "object without raw field".to_string(),
                },
            },
            other => Self::Unrecognized {
                kind: json_kind(&other).to_string(),
            },
        }
    }

    /// Short name of the shape, for logging.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::RawText(_) => "raw_text",
            Self::RecordList(_) => "record_list",
            Self::Wrapper(Payload::RawText(_)) => "wrapper_raw_text",
            Self::Wrapper(Payload::RecordList(_)) => "wrapper_record_list",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A retrieval step that produces papers for a topic.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run(&self, topic: &str, top_n: u32) -> Result<OrchestrationOutput, OrchestrationError>;
}

/// The default orchestrator: one search call, emitted as a JSON-encoded array.
pub struct SearchStepOrchestrator {
    search: Arc<dyn PaperSearch>,
}

impl SearchStepOrchestrator {
    pub fn new(search: Arc<dyn PaperSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Orchestrator for SearchStepOrchestrator {
    async fn run(&self, topic: &str, top_n: u32) -> Result<OrchestrationOutput, OrchestrationError> {
        let papers = self.search.search(topic, top_n).await;
        let text = serde_json::to_string(&papers).map_err(OrchestrationError::Encode)?;
        debug!(topic, papers = papers.len(), "Search step finished");
        Ok(OrchestrationOutput::RawText(text))
    }
}

/// Runs the orchestration step with a direct-search fallback.
pub struct OrchestrationAdapter {
    orchestrator: Arc<dyn Orchestrator>,
    search: Arc<dyn PaperSearch>,
    enabled: bool,
    fallback_on_error: bool,
}

impl OrchestrationAdapter {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, search: Arc<dyn PaperSearch>) -> Self {
        Self {
            orchestrator,
            search,
            enabled: true,
            fallback_on_error: true,
        }
    }

    /// Skip the orchestrator and search directly.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Propagate orchestrator errors instead of falling back.
    pub fn with_fallback_on_error(mut self, fallback: bool) -> Self {
        self.fallback_on_error = fallback;
        self
    }

    /// Run the step. The output shape is passed through untouched.
    pub async fn run(
        &self,
        topic: &str,
        top_n: u32,
    ) -> Result<OrchestrationOutput, OrchestrationError> {
        if !self.enabled {
            debug!(topic, "Orchestration disabled, searching directly");
            return Ok(self.direct_search(topic, top_n).await);
        }

        match self.orchestrator.run(topic, top_n).await {
            Ok(output) => {
                info!(topic, shape = output.shape(), "Orchestration step completed");
                Ok(output)
            }
            Err(e) if self.fallback_on_error => {
                warn!(topic, error = %e, "Orchestration step failed, falling back to direct search");
                Ok(self.direct_search(topic, top_n).await)
            }
            Err(e) => Err(e),
        }
    }

    async fn direct_search(&self, topic: &str, top_n: u32) -> OrchestrationOutput {
        let papers = self.search.search(topic, top_n).await;
        OrchestrationOutput::RecordList(records_to_values(&papers))
    }
}
