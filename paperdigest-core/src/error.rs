//! Error types for the paperdigest core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering text generation, paper search, orchestration, configuration and
//! request validation.

/// Top-level error type for the paperdigest core library.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl DigestError {
    /// Whether this error was caused by the caller rather than by the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DigestError::InvalidRequest { .. })
    }
}

/// Errors from text-generation provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the academic search backend.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search API returned status {status}")]
    Status { status: u16 },

    #[error("Failed to parse search response: {message}")]
    Parse { message: String },
}

/// Errors from the orchestration step.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Failed to encode step output: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `DigestError`.
pub type Result<T> = std::result::Result<T, DigestError>;
