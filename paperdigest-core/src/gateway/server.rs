//! REST gateway server built on axum.

use crate::error::DigestError;
use crate::pipeline::ResearchPipeline;
use crate::types::{HealthResponse, SearchResponse, SummarizeRequest};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// The pipeline shared by every handler.
pub type SharedPipeline = Arc<ResearchPipeline>;

/// A pipeline failure rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError(DigestError);

impl From<DigestError> for ApiError {
    fn from(err: DigestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            DigestError::InvalidRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
            other => {
                error!(error = %other, "Pipeline execution failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Pipeline execution failed: {}", other),
                )
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Build an axum Router with `/api/health` and `/api/summarize` routes.
pub fn router(pipeline: SharedPipeline) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/summarize", post(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn summarize_handler(
    State(pipeline): State<SharedPipeline>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = pipeline.run(&request.topic, request.top_n).await?;
    Ok(Json(response))
}

/// Serve the gateway on `addr` until cancelled.
pub async fn run(pipeline: SharedPipeline, addr: &str) -> Result<(), std::io::Error> {
    let app = router(pipeline);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "paperdigest gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use axum::body::Body;
    use tower::ServiceExt;

    async fn error_body(err: DigestError) -> (StatusCode, serde_json::Value) {
        let resp = ApiError::from(err).into_response();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_request_maps_to_400() {
        let (status, json) = error_body(DigestError::InvalidRequest {
            message: "Topic must not be empty".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "Topic must not be empty");
    }

    #[tokio::test]
    async fn test_pipeline_error_maps_to_500() {
        let (status, json) = error_body(DigestError::Orchestration(
            OrchestrationError::StepFailed {
                step: "search".into(),
                message: "boom".into(),
            },
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["detail"],
            "Pipeline execution failed: Orchestration error: Step 'search' failed: boom"
        );
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let pipeline = ResearchPipeline::from_config(&crate::config::DigestConfig::default())
            .unwrap();
        let app = router(Arc::new(pipeline));
        let req = axum::http::Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }
}
