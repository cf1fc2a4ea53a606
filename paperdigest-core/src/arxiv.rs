//! arXiv search backend: relevance query, Atom feed parsing and request spacing.
//!
//! Every query is `all:<topic>` sorted by relevance, best match first. Entries
//! map straight onto `PaperRecord`: the entry `<id>` becomes the link and the
//! `<published>` timestamp is shortened to `YYYY-MM-DD`.

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::search::PaperSearch;
use crate::types::PaperRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const ARXIV_API_BASE: &str = "https://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("paperdigest/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the arXiv query API.
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ArxivClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivClient")
            .field("base_url", &self.base_url)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl ArxivClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Request {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('?').to_string(),
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until `min_interval` has passed since the previous request.
    ///
    /// The timestamp lock is held through the sleep so concurrent callers queue up.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let remaining = self.min_interval.saturating_sub(previous.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Run one relevance-ordered query and parse the feed.
    pub async fn query(&self, topic: &str, max_results: u32) -> Result<Vec<PaperRecord>, SearchError> {
        self.wait_turn().await;
        let url = build_search_url(&self.base_url, topic, max_results);
        debug!(url = url.as_str(), "Querying arXiv");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::Request {
                message: format!("arXiv request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SearchError::Request {
            message: format!("Failed to read arXiv response: {}", e),
        })?;

        parse_feed(&body)
    }
}

#[async_trait]
impl PaperSearch for ArxivClient {
    async fn search(&self, query: &str, max_results: u32) -> Vec<PaperRecord> {
        match self.query(query, max_results).await {
            Ok(mut papers) => {
                papers.truncate(max_results as usize);
                debug!(query, returned = papers.len(), "arXiv search completed");
                papers
            }
            Err(e) => {
                warn!(query, error = %e, "arXiv search failed, returning no papers");
                Vec::new()
            }
        }
    }
}

/// Build the query URL: `all:<topic>`, relevance first, at most `max_results`.
pub fn build_search_url(base_url: &str, topic: &str, max_results: u32) -> String {
    format!(
        "{}?search_query={}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
        base_url,
        urlencoding::encode(&format!("all:{}", topic.trim())),
        max_results,
    )
}

/// Parse an Atom feed into papers, skipping entries without an `<id>` or `<title>`.
pub fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>, SearchError> {
    if !xml.contains("<feed") {
        return Err(SearchError::Parse {
            message: "Response is not an Atom feed".to_string(),
        });
    }
    Ok(blocks(xml, "entry").filter_map(parse_entry).collect())
}

fn parse_entry(entry: &str) -> Option<PaperRecord> {
    let link = tag_text(entry, "id")?;
    let title = clean_text(&tag_text(entry, "title")?);
    let authors = blocks(entry, "author")
        .filter_map(|author| tag_text(author, "name"))
        .map(|name| clean_text(&name))
        .collect();

    Some(PaperRecord {
        title,
        authors,
        abstract_text: tag_text(entry, "summary")
            .map(|s| clean_text(&s))
            .unwrap_or_default(),
        link,
        published: tag_text(entry, "published").and_then(|p| format_published_date(&p)),
    })
}

/// Every `<tag>...</tag>` block in `xml`, outer tags included.
fn blocks<'a>(xml: &'a str, tag: &str) -> impl Iterator<Item = &'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut rest = xml;
    std::iter::from_fn(move || {
        let start = rest.find(&open)?;
        let len = rest[start..].find(&close)? + close.len();
        let block = &rest[start..start + len];
        rest = &rest[start + len..];
        Some(block)
    })
}

/// Trimmed text of the first `<tag>` element; attributes on the tag are allowed,
/// tags that merely share the prefix (`<identifier>` for `id`) are not.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    let start = loop {
        let pos = from + xml[from..].find(&open)?;
        let after = pos + open.len();
        match xml[after..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => break pos,
            _ => from = after,
        }
    };
    let content_start = start + xml[start..].find('>')? + 1;
    let content_end = content_start + xml[content_start..].find(&close)?;
    Some(xml[content_start..content_end].trim().to_string())
}

/// Decode XML entities and collapse whitespace runs to single spaces.
fn clean_text(raw: &str) -> String {
    let decoded = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format an Atom timestamp such as "2017-06-12T17:57:34Z" as "2017-06-12" (UTC).
pub fn format_published_date(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <title>ArXiv Query</title>
  <id>http://arxiv.org/api/feed-id</id>
  <opensearch:totalResults>100</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T01:09:28Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You Need</title>
    <summary>  The dominant sequence transduction models are based on complex recurrent or
convolutional neural networks.  </summary>
    <author><name>Ashish Vaswani</name></author>
    <author>
      <name>Noam Shazeer</name>
      <arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">Google</arxiv:affiliation>
    </author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <published>2018-10-11T00:00:00Z</published>
    <title>BERT: Pre-training of Deep
      Bidirectional Transformers</title>
    <summary>We introduce a new language representation model.</summary>
    <author><name>Jacob Devlin</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2005.14165v4</id>
    <title>Language Models are Few-Shot Learners</title>
    <summary>Recent work demonstrates substantial gains.</summary>
  </entry>
</feed>"#;

    fn closed_port_config(min_interval_ms: u64) -> SearchConfig {
        SearchConfig {
            // Nothing listens on the discard port.
            base_url: "http://127.0.0.1:9/api/query".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 1,
            min_interval_ms,
        }
    }

    #[test]
    fn test_parse_feed_maps_entries() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers.len(), 3);

        let first = &papers[0];
        assert_eq!(first.title, "Attention Is All You Need");
        assert_eq!(first.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(first.link, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(first.published.as_deref(), Some("2017-06-12"));
        assert!(first.abstract_text.starts_with("The dominant sequence"));
        assert!(!first.abstract_text.contains('\n'));

        assert_eq!(
            papers[1].title,
            "BERT: Pre-training of Deep Bidirectional Transformers"
        );
        assert!(papers[2].authors.is_empty());
        assert!(papers[2].published.is_none());
    }

    #[test]
    fn test_parse_feed_without_entries() {
        let feed = "<feed><opensearch:totalResults>0</opensearch:totalResults></feed>";
        assert!(parse_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        let err = parse_feed("<html>Service Unavailable</html>").unwrap_err();
        assert!(matches!(err, SearchError::Parse { .. }));
    }

    #[test]
    fn test_entities_are_decoded() {
        let feed = r#"<feed><entry><id>http://arxiv.org/abs/2301.00001v1</id>
            <title>Q&amp;A over &lt;Graphs&gt;</title>
            <summary>Short.</summary></entry></feed>"#;
        assert_eq!(parse_feed(feed).unwrap()[0].title, "Q&A over <Graphs>");
    }

    #[test]
    fn test_entry_without_id_is_skipped() {
        let feed = "<feed><entry><title>No id</title></entry></feed>";
        assert!(parse_feed(feed).unwrap().is_empty());
    }

    #[test]
    fn test_tag_text_ignores_prefix_matches() {
        let xml = "<identifier>nope</identifier><id>yes</id>";
        assert_eq!(tag_text(xml, "id").as_deref(), Some("yes"));
        assert_eq!(
            tag_text(r#"<title type="text"> T </title>"#, "title").as_deref(),
            Some("T")
        );
    }

    #[test]
    fn test_format_published_date() {
        assert_eq!(
            format_published_date("2017-06-12T17:57:34Z").as_deref(),
            Some("2017-06-12")
        );
        assert_eq!(
            format_published_date("2017-06-12T23:30:00-02:00").as_deref(),
            Some("2017-06-13")
        );
        assert!(format_published_date("").is_none());
        assert!(format_published_date("yesterday").is_none());
    }

    #[test]
    fn test_build_search_url() {
        let url = build_search_url(ARXIV_API_BASE, " transformer attention ", 2);
        assert_eq!(
            url,
            "https://export.arxiv.org/api/query?search_query=all%3Atransformer%20attention&start=0&max_results=2&sortBy=relevance&sortOrder=descending"
        );
    }

    #[tokio::test]
    async fn test_search_failure_returns_empty() {
        let client = ArxivClient::new(&closed_port_config(0)).unwrap();
        assert!(client.search("anything", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_consecutive_searches_are_spaced_out() {
        let client = ArxivClient::new(&closed_port_config(400)).unwrap();
        let started = Instant::now();
        assert!(client.search("first", 1).await.is_empty());
        assert!(client.search("second", 1).await.is_empty());
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(400),
            "second request went out after only {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_first_search_is_not_delayed() {
        let client = ArxivClient::new(&closed_port_config(5_000)).unwrap();
        let started = Instant::now();
        client.search("only", 1).await;
        assert!(started.elapsed() < Duration::from_millis(2_500));
    }

    // Integration test: requires network access
    #[tokio::test]
    #[ignore]
    async fn test_real_search() {
        let client = ArxivClient::new(&SearchConfig::default()).unwrap();
        let papers = client.search("attention is all you need", 3).await;
        assert!(!papers.is_empty());
        assert!(papers.len() <= 3);
    }
}
