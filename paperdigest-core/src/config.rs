//! Configuration system for paperdigest.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment. The user configuration lives at
//! `<config_dir>/paperdigest/config.toml`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
}

impl DigestConfig {
    /// Validate the whole configuration and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid. Problems are reported as
    /// human-readable warnings and never fail loading.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for w in self.llm.validate() {
            warnings.push(format!("[llm] {}", w));
        }
        for w in self.pipeline.validate() {
            warnings.push(format!("[pipeline] {}", w));
        }
        if self.search.min_interval_ms < 3000 {
            warnings.push(format!(
                "[search] min_interval_ms is {}; the arXiv API asks for at least 3000ms between requests",
                self.search.min_interval_ms
            ));
        }
        warnings
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the text-generation provider used for summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name. Only "gemini" is supported.
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.5-flash"). A leading `models/` is ignored.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// API key set directly in configuration. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Maximum tokens to generate per summary.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for transient provider errors.
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 1024,
            temperature: 0.2,
            timeout_secs: 60,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// The model identifier with any `models/` prefix removed.
    pub fn model_id(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    /// Resolve the API key from configuration or the environment.
    ///
    /// Empty values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature ({}) is outside the supported range 0.0-2.0",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            warnings.push("max_tokens is 0; every summary will come back empty".to_string());
        }
        warnings
    }
}

/// Exponential backoff policy for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Configuration for the arXiv search client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the arXiv query API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Minimum delay between consecutive API requests, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: crate::arxiv::ARXIV_API_BASE.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            min_interval_ms: 3000,
        }
    }
}

/// Configuration for the research pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of papers used when a request omits `top_n` (or sends 0).
    pub default_top_n: u32,
    /// Upper bound applied to every requested `top_n`.
    pub max_top_n: u32,
    /// Maximum number of summarization calls in flight per request.
    pub summary_concurrency: usize,
    /// Route retrieval through the orchestration step.
    pub orchestration_enabled: bool,
    /// Fall back to a direct search when the orchestration step fails.
    pub fallback_on_orchestration_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_top_n: 5,
            max_top_n: 50,
            summary_concurrency: 4,
            orchestration_enabled: true,
            fallback_on_orchestration_error: true,
        }
    }
}

impl PipelineConfig {
    /// Apply the default for a missing or zero `top_n` and clamp to `max_top_n`.
    pub fn effective_top_n(&self, requested: Option<u32>) -> u32 {
        let n = match requested {
            Some(n) if n > 0 => n,
            _ => self.default_top_n.max(1),
        };
        n.min(self.max_top_n.max(1))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.summary_concurrency == 0 {
            warnings.push(
                "summary_concurrency is 0; summaries will be generated one at a time".to_string(),
            );
        }
        if self.default_top_n > self.max_top_n {
            warnings.push(format!(
                "default_top_n ({}) exceeds max_top_n ({}); requests will be clamped",
                self.default_top_n, self.max_top_n
            ));
        }
        if !self.orchestration_enabled && !self.fallback_on_orchestration_error {
            warnings.push(
                "fallback_on_orchestration_error has no effect while orchestration is disabled"
                    .to_string(),
            );
        }
        warnings
    }
}

/// Path of the user-level configuration file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "paperdigest", "paperdigest")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables prefixed with `PAPERDIGEST_` (`PAPERDIGEST_LLM__MODEL`, ...)
/// 2. `HOST`, `PORT` and `GEMINI_MODEL`
/// 3. The explicit config file, if given
/// 4. User config (`<config_dir>/paperdigest/config.toml`)
/// 5. Built-in defaults
pub fn load_config(config_file: Option<&Path>) -> Result<DigestConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DigestConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(
            Env::raw()
                .only(&["HOST", "PORT"])
                .map(|key| format!("server.{}", key.as_str().to_ascii_lowercase()).into()),
        )
        .merge(Env::raw().only(&["GEMINI_MODEL"]).map(|_| "llm.model".into()))
        .merge(Env::prefixed("PAPERDIGEST_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
