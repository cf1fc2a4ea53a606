//! Core data types for paperdigest.
//!
//! Every record here is constructed per request and serialized straight onto the
//! wire. Missing upstream data is coerced to empty values so that every field is
//! always present in the JSON output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical paper metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub link: String,
    /// Publication date as `YYYY-MM-DD`.
    #[serde(default)]
    pub published: Option<String>,
}

impl PaperRecord {
    /// Coerce a raw JSON object into a `PaperRecord`.
    ///
    /// Non-string scalars become `""`, non-array author lists become `[]`
    /// (non-string authors are skipped) and a non-string `published` becomes `None`.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let authors = obj
            .get("authors")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: string_field(obj, "title"),
            authors,
            abstract_text: string_field(obj, "abstract"),
            link: string_field(obj, "link"),
            published: obj
                .get("published")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Authors joined with `", "`, the form used in summarization prompts.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

/// Four-part structured summary of a paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub findings: String,
    #[serde(default)]
    pub limitations: String,
}

impl SummaryRecord {
    /// The keys every summary carries, in wire order.
    pub const KEYS: [&'static str; 4] = ["problem", "methodology", "findings", "limitations"];

    /// The all-empty summary used whenever summarization fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a summary from a JSON object, filling missing or non-string keys with `""`.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            problem: string_field(obj, "problem"),
            methodology: string_field(obj, "methodology"),
            findings: string_field(obj, "findings"),
            limitations: string_field(obj, "limitations"),
        }
    }
}

/// A paper with its structured summary attached. This is the unit returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedPaper {
    #[serde(flatten)]
    pub paper: PaperRecord,
    pub summary: SummaryRecord,
}

/// Response body of `POST /api/summarize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub topic: String,
    /// Identifier of the summarization model.
    pub model: String,
    pub papers: Vec<EnrichedPaper>,
}

/// Request body of `POST /api/summarize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// Required; an absent field is a schema error, a blank one a bad request.
    pub topic: String,
    #[serde(default)]
    pub top_n: Option<u32>,
}

/// Response body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
