//! Text-generation providers.
//!
//! `TextGenerator` is the seam between the summarizer and an LLM backend:
//! a model identifier plus a prompt in, free-form text out. `GeminiProvider`
//! talks to the Google Gemini API; `MockTextGenerator` serves canned replies
//! in tests.
//!
//! Use `create_generator()` to instantiate the configured provider.

pub mod gemini;

use crate::config::{LlmConfig, RetryConfig};
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use gemini::GeminiProvider;

/// An LLM backend that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Return the model identifier.
    fn model_name(&self) -> &str;
}

/// Create the Gemini text generator described by `config`.
///
/// Returns `Ok(None)` when no API key is available; summaries then come back
/// empty instead of failing requests.
pub fn create_generator(config: &LlmConfig) -> Result<Option<Arc<dyn TextGenerator>>, LlmError> {
    if config.resolve_api_key().is_none() {
        tracing::warn!(
            env = config.api_key_env.as_str(),
            "No API key for the summarization model; summaries will be empty"
        );
        return Ok(None);
    }
    Ok(Some(Arc::new(GeminiProvider::new(config)?)))
}

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `LlmError::RateLimited` (respects `retry_after_secs`) and
/// `LlmError::Connection`. Permanent errors (auth, parse, bad request) return immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt >= config.max_retries {
                    return Err(e);
                }
                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Check if an error is retryable (transient).
fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::RateLimited { .. } | LlmError::Connection { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &LlmError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    if let LlmError::RateLimited { retry_after_secs } = err {
        return (retry_after_secs * 1000).max(computed).min(config.max_backoff_ms);
    }
    computed
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    base.min(config.max_backoff_ms as f64) as u64
}

/// A text generator that replays queued responses, for tests.
///
/// When the queue runs dry it keeps returning the fallback reply, if any,
/// otherwise an `ApiRequest` error.
pub struct MockTextGenerator {
    model: String,
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a generator that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::new()
        }
    }

    /// Queue a reply for the next call.
    pub fn queue_response(&self, response: Result<String, LlmError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let queued = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match (queued, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(LlmError::ApiRequest {
                message: "mock generator has no response queued".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
