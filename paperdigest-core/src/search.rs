//! The paper search seam.
//!
//! `PaperSearch` is the narrow interface every retrieval backend implements.
//! Implementations never fail: transport or provider errors are logged and
//! reported as an empty result so a flaky search degrades to "zero papers"
//! instead of failing the request.

use crate::types::PaperRecord;
use async_trait::async_trait;

/// A relevance-ranked academic paper search.
#[async_trait]
pub trait PaperSearch: Send + Sync {
    /// Return at most `max_results` papers for `query`, best match first.
    async fn search(&self, query: &str, max_results: u32) -> Vec<PaperRecord>;
}

/// Encode papers as a JSON array of raw records.
pub fn records_to_values(papers: &[PaperRecord]) -> Vec<serde_json::Value> {
    papers
        .iter()
        .filter_map(|p| serde_json::to_value(p).ok())
        .collect()
}
