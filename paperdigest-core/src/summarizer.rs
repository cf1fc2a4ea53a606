//! Structured paper summarization.
//!
//! `LlmSummarizer` asks a `TextGenerator` for a strict-JSON four-key summary of a
//! paper's metadata. Every failure path (no generator, provider error, empty or
//! malformed reply) produces `SummaryRecord::empty()`; summarization never fails
//! a request.

use crate::providers::TextGenerator;
use crate::types::{PaperRecord, SummaryRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces a `SummaryRecord` for a paper.
#[async_trait]
pub trait Summarize: Send + Sync {
    /// Summarize `paper`. Infallible: failures yield the empty summary.
    async fn summarize(&self, paper: &PaperRecord) -> SummaryRecord;

    /// Identifier of the model behind the summaries.
    fn model_name(&self) -> &str;
}

/// Summarizer backed by an optional text generator.
pub struct LlmSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
    model: String,
}

impl LlmSummarizer {
    /// Create a summarizer. With no generator every summary is empty and the
    /// reported model is `model` as configured (no fixed `gemini-2.5-flash`
    /// stand-in); with one, the generator's own model id is reported.
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, model: impl Into<String>) -> Self {
        let model = match &generator {
            Some(g) => g.model_name().to_string(),
            None => model.into(),
        };
        Self { generator, model }
    }
}

#[async_trait]
impl Summarize for LlmSummarizer {
    async fn summarize(&self, paper: &PaperRecord) -> SummaryRecord {
        let Some(generator) = &self.generator else {
            return SummaryRecord::empty();
        };

        let prompt = build_prompt(paper);
        match generator.generate(&prompt).await {
            Ok(text) => {
                let summary = parse_summary(&text);
                if summary.is_none() {
                    debug!(title = paper.title.as_str(), "Unparsable summary reply");
                }
                summary.unwrap_or_default()
            }
            Err(e) => {
                warn!(title = paper.title.as_str(), error = %e, "Summarization failed");
                SummaryRecord::empty()
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Build the summarization prompt for a paper.
pub fn build_prompt(paper: &PaperRecord) -> String {
    format!(
        "Summarize the following paper metadata into strict JSON with keys: problem, methodology, findings, limitations.\n\
         Respond with JSON only.\n\n\
         Title: {}\n\
         Authors: {}\n\
         Abstract: {}\n",
        paper.title,
        paper.authors_joined(),
        paper.abstract_text
    )
}

/// Strip a surrounding markdown code fence from a model reply.
///
/// Only a leading fence (optionally tagged `json`) and a trailing fence are
/// removed; text outside them is left alone.
pub fn clean_json_text(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parse a model reply into a summary. `None` when the cleaned reply is not a
/// JSON object.
pub fn parse_summary(text: &str) -> Option<SummaryRecord> {
    // An empty reply counts as an empty object.
    let cleaned = if text.trim().is_empty() {
        "{}"
    } else {
        clean_json_text(text)
    };
    match serde_json::from_str::<Value>(cleaned).ok()? {
        Value::Object(obj) => Some(SummaryRecord::from_object(&obj)),
        _ => None,
    }
}
