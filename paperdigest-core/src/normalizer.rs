//! Result normalization.
//!
//! Reconciles every `OrchestrationOutput` shape into the canonical list of
//! `EnrichedPaper`s:
//!
//! 1. extract the raw record list from the output (bad JSON counts as empty);
//! 2. if nothing came out, search directly with the same topic and bound;
//! 3. coerce each object record to a `PaperRecord`, dropping non-objects;
//! 4. keep an embedded non-empty summary, otherwise summarize the paper.
//!
//! Output order always equals input order, even with concurrent summarization.

use crate::orchestration::{OrchestrationOutput, Payload};
use crate::search::{records_to_values, PaperSearch};
use crate::summarizer::Summarize;
use crate::types::{EnrichedPaper, PaperRecord, SummaryRecord};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns orchestration output into enriched papers.
pub struct ResultNormalizer {
    search: Arc<dyn PaperSearch>,
    summarizer: Arc<dyn Summarize>,
    concurrency: usize,
}

/// A coerced record and its summary, if one was embedded.
struct PendingPaper {
    paper: PaperRecord,
    embedded: Option<SummaryRecord>,
}

impl ResultNormalizer {
    pub fn new(search: Arc<dyn PaperSearch>, summarizer: Arc<dyn Summarize>) -> Self {
        Self {
            search,
            summarizer,
            concurrency: 1,
        }
    }

    /// Maximum summarization calls in flight. 0 is treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn normalize(
        &self,
        raw: OrchestrationOutput,
        topic: &str,
        top_n: u32,
    ) -> Vec<EnrichedPaper> {
        let mut records = extract_records(raw);

        if records.is_empty() {
            info!(topic, top_n, "No papers from orchestration, searching directly");
            let papers = self.search.search(topic, top_n).await;
            records = records_to_values(&papers);
        }

        let pending: Vec<PendingPaper> = records.iter().filter_map(coerce_record).collect();
        let dropped = records.len() - pending.len();
        if dropped > 0 {
            debug!(dropped, "Dropped records that are not JSON objects");
        }

        stream::iter(pending)
            .map(|item| self.enrich(item))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn enrich(&self, item: PendingPaper) -> EnrichedPaper {
        let summary = match item.embedded {
            Some(summary) => summary,
            None => self.summarizer.summarize(&item.paper).await,
        };
        EnrichedPaper {
            paper: item.paper,
            summary,
        }
    }
}

/// Pull the raw record list out of any output shape.
pub fn extract_records(raw: OrchestrationOutput) -> Vec<Value> {
    match raw {
        OrchestrationOutput::RawText(text) => parse_record_text(&text),
        OrchestrationOutput::RecordList(records) => records,
        OrchestrationOutput::Wrapper(Payload::RawText(text)) => parse_record_text(&text),
        OrchestrationOutput::Wrapper(Payload::RecordList(records)) => records,
        OrchestrationOutput::Unrecognized { kind } => {
            warn!(kind = kind.as_str(), "Unrecognized orchestration output");
            Vec::new()
        }
    }
}

fn parse_record_text(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(records)) => records,
        Ok(other) => {
            warn!(
                kind = OrchestrationOutput::from_value(other).shape(),
                "Orchestration text is not a JSON array"
            );
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse orchestration text as JSON");
            Vec::new()
        }
    }
}

fn coerce_record(record: &Value) -> Option<PendingPaper> {
    let obj = record.as_object()?;
    let embedded = match obj.get("summary") {
        Some(Value::Object(summary)) if !summary.is_empty() => {
            Some(SummaryRecord::from_object(summary))
        }
        _ => None,
    };
    Some(PendingPaper {
        paper: PaperRecord::from_object(obj),
        embedded,
    })
}
