//! Completion Provider Abstraction
//!
//! Defines the `CompletionProvider` trait for plain-text completions.
//! Every provider returns a `CompletionResponse` carrying the raw text plus
//! token usage and timing for the attempt log.
//!
//! Transport faults (unreachable endpoint, non-2xx status, undecodable body)
//! surface as `SpendError::Transport`. A blank completion is NOT an error at
//! this layer; the attempt loop decides what to do with it.

mod ollama;

pub use ollama::OllamaProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::constants::{llm, network};
use crate::types::Result;

// =============================================================================
// Completion Response with Usage Metrics
// =============================================================================

/// Complete provider response including raw text and usage metrics
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Full completion text, untrimmed
    pub text: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
}

impl CompletionResponse {
    /// Create response with text only (usage unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
    /// Server-side processing time in milliseconds, when reported
    pub api_ms: Option<u64>,
}

impl ResponseTiming {
    pub fn with_api_time(duration: std::time::Duration, api_ms: Option<u64>) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
            api_ms,
        }
    }
}

/// Shared provider type, one per pipeline
pub type SharedProvider = Arc<dyn CompletionProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for one completion provider instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Endpoint base URL
    pub api_base: String,
    /// Model name
    pub model: String,
    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
    /// Output length cap
    pub num_predict: u32,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: llm::DEFAULT_API_BASE.to_string(),
            model: llm::DEFAULT_SQL_MODEL.to_string(),
            temperature: llm::TEMPERATURE,
            num_predict: llm::NUM_PREDICT,
            connect_timeout_secs: network::CONNECT_TIMEOUT_SECS,
            timeout_secs: network::READ_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    /// Provider settings for `model` taken from the `[llm]` section
    pub fn from_llm(config: &LlmConfig, model: &str) -> Self {
        Self {
            api_base: config.base_url.clone(),
            model: model.to_string(),
            temperature: config.temperature,
            num_predict: config.num_predict,
            connect_timeout_secs: config.connect_timeout_secs,
            timeout_secs: config.read_timeout_secs,
        }
    }
}

// =============================================================================
// Completion Provider Trait
// =============================================================================

/// Text completion provider
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, returning the full (possibly blank) text.
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Endpoint identity used in transport error messages
    fn endpoint(&self) -> &str;

    /// Check if the provider is reachable and the model is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared Ollama provider for `model`
pub fn create_provider(config: &LlmConfig, model: &str) -> Result<SharedProvider> {
    Ok(Arc::new(OllamaProvider::new(ProviderConfig::from_llm(
        config, model,
    ))?))
}
