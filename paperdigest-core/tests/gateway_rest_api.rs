//! Integration tests for the gateway REST API endpoints.

use async_trait::async_trait;
use axum::body::Body;
use paperdigest_core::config::PipelineConfig;
use paperdigest_core::error::OrchestrationError;
use paperdigest_core::gateway::gateway_router;
use paperdigest_core::{
    LlmSummarizer, MockTextGenerator, OrchestrationOutput, Orchestrator, PaperRecord, PaperSearch,
    ResearchPipeline, SearchStepOrchestrator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SUMMARY_JSON: &str = r#"```json
{"problem": "P", "methodology": "M", "findings": "F", "limitations": "L"}
```"#;

#[derive(Default)]
struct StubSearch {
    calls: Mutex<Vec<(String, u32)>>,
}

impl StubSearch {
    fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaperSearch for StubSearch {
    async fn search(&self, query: &str, max_results: u32) -> Vec<PaperRecord> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        (0..max_results)
            .map(|i| PaperRecord {
                title: format!("Paper {i}"),
                authors: vec!["Jane Doe".into(), "John Roe".into()],
                abstract_text: "An abstract.".into(),
                link: format!("http://arxiv.org/abs/2301.0000{i}v2"),
                published: Some("2023-01-02".into()),
            })
            .collect()
    }
}

struct BrokenOrchestrator {
    calls: AtomicUsize,
}

#[async_trait]
impl Orchestrator for BrokenOrchestrator {
    async fn run(&self, _: &str, _: u32) -> Result<OrchestrationOutput, OrchestrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OrchestrationError::StepFailed {
            step: "search".into(),
            message: "upstream unavailable".into(),
        })
    }
}

struct Fixture {
    search: Arc<StubSearch>,
    generator: Arc<MockTextGenerator>,
    app: axum::Router,
}

fn fixture(config: PipelineConfig) -> Fixture {
    let search = Arc::new(StubSearch::default());
    let generator = Arc::new(MockTextGenerator::with_response(SUMMARY_JSON));
    let summarizer = Arc::new(LlmSummarizer::new(Some(generator.clone()), "unused"));
    let orchestrator = Arc::new(SearchStepOrchestrator::new(search.clone()));
    let pipeline = ResearchPipeline::new(search.clone(), orchestrator, summarizer, config);
    Fixture {
        search,
        generator,
        app: gateway_router(Arc::new(pipeline)),
    }
}

fn make_request(uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn make_post_request(uri: &str, body: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(
    app: axum::Router,
    req: axum::http::Request<Body>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// --- /api/health ---

#[tokio::test]
async fn test_api_health_returns_ok() {
    let f = fixture(PipelineConfig::default());
    let (status, json) = send(f.app, make_request("/api/health")).await;
    assert_eq!(status, 200);
    assert_eq!(json, serde_json::json!({"status": "ok"}));
}

// --- /api/summarize ---

#[tokio::test]
async fn test_summarize_returns_enriched_papers() {
    let f = fixture(PipelineConfig::default());
    let (status, json) = send(
        f.app,
        make_post_request("/api/summarize", r#"{"topic": "transformer attention", "top_n": 2}"#),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(json["topic"], "transformer attention");
    assert_eq!(json["model"], "mock-model");
    let papers = json["papers"].as_array().unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0]["title"], "Paper 0");
    assert_eq!(papers[0]["authors"], serde_json::json!(["Jane Doe", "John Roe"]));
    assert_eq!(papers[0]["abstract"], "An abstract.");
    assert_eq!(papers[0]["published"], "2023-01-02");
    assert_eq!(papers[1]["summary"]["methodology"], "M");
    assert_eq!(f.generator.call_count(), 2);
    assert!(f.generator.prompts()[1].contains("Title: Paper 1"));
}

#[tokio::test]
async fn test_summarize_defaults_and_clamps_top_n() {
    let f = fixture(PipelineConfig::default());
    let (status, json) = send(
        f.app.clone(),
        make_post_request("/api/summarize", r#"{"topic": "graphs"}"#),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["papers"].as_array().unwrap().len(), 5);

    let (status, _) = send(
        f.app.clone(),
        make_post_request("/api/summarize", r#"{"topic": "graphs", "top_n": 0}"#),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = send(
        f.app,
        make_post_request("/api/summarize", r#"{"topic": "graphs", "top_n": 1000}"#),
    )
    .await;
    assert_eq!(status, 200);

    assert_eq!(
        f.search.calls(),
        vec![
            ("graphs".to_string(), 5),
            ("graphs".to_string(), 5),
            ("graphs".to_string(), 50),
        ]
    );
}

#[tokio::test]
async fn test_summarize_empty_topic_returns_400() {
    for body in [r#"{"topic": ""}"#, r#"{"topic": "   ", "top_n": 3}"#] {
        let f = fixture(PipelineConfig::default());
        let (status, json) = send(f.app, make_post_request("/api/summarize", body)).await;
        assert_eq!(status, 400);
        assert_eq!(json["detail"], "Topic must not be empty");
        assert!(f.search.calls().is_empty());
        assert_eq!(f.generator.call_count(), 0);
    }
}

#[tokio::test]
async fn test_summarize_missing_topic_is_schema_error() {
    let f = fixture(PipelineConfig::default());
    let (status, _) = send(f.app, make_post_request("/api/summarize", r#"{"top_n": 2}"#)).await;
    assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    assert!(f.search.calls().is_empty());
    assert_eq!(f.generator.call_count(), 0);
}

#[tokio::test]
async fn test_summarize_malformed_body_is_rejected() {
    let f = fixture(PipelineConfig::default());
    let (status, _) = send(f.app, make_post_request("/api/summarize", "{not json")).await;
    assert!(status.is_client_error());
    assert!(f.search.calls().is_empty());
}

#[tokio::test]
async fn test_summarize_orchestration_error_without_fallback_returns_500() {
    let search = Arc::new(StubSearch::default());
    let orchestrator = Arc::new(BrokenOrchestrator {
        calls: AtomicUsize::new(0),
    });
    let pipeline = ResearchPipeline::new(
        search.clone(),
        orchestrator.clone(),
        Arc::new(LlmSummarizer::new(None, "gemini-2.5-flash")),
        PipelineConfig {
            fallback_on_orchestration_error: false,
            ..PipelineConfig::default()
        },
    );
    let app = gateway_router(Arc::new(pipeline));
    let (status, json) = send(
        app,
        make_post_request("/api/summarize", r#"{"topic": "graphs"}"#),
    )
    .await;

    assert_eq!(status, 500);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Pipeline execution failed: "));
    assert!(detail.contains("upstream unavailable"));
    assert_eq!(orchestrator.calls.load(Ordering::SeqCst), 1);
    assert!(search.calls().is_empty());
}

#[tokio::test]
async fn test_summarize_without_generator_returns_empty_summaries() {
    let search = Arc::new(StubSearch::default());
    let pipeline = ResearchPipeline::new(
        search.clone(),
        Arc::new(SearchStepOrchestrator::new(search.clone())),
        Arc::new(LlmSummarizer::new(None, "gemini-2.5-flash")),
        PipelineConfig::default(),
    );
    let app = gateway_router(Arc::new(pipeline));
    let (status, json) = send(
        app,
        make_post_request("/api/summarize", r#"{"topic": "graphs", "top_n": 1}"#),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["model"], "gemini-2.5-flash");
    assert_eq!(
        json["papers"][0]["summary"],
        serde_json::json!({"problem": "", "methodology": "", "findings": "", "limitations": ""})
    );
}
