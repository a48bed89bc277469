//! Ollama Completion Provider
//!
//! Posts non-streaming generate requests to an Ollama-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    CompletionProvider, CompletionResponse, ProviderConfig, ResponseTiming, TokenUsage,
};
use crate::types::{Result, SpendError};

const GENERATE_PATH: &str = "/api/generate";
const TAGS_PATH: &str = "/api/tags";

/// Ollama completion provider
pub struct OllamaProvider {
    api_base: String,
    generate_url: String,
    model: String,
    temperature: f32,
    num_predict: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        // Validate endpoint URL for security (SSRF prevention)
        let api_base = Self::validate_endpoint(&config.api_base)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SpendError::FatalConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            generate_url: format!("{}{}", api_base, GENERATE_PATH),
            api_base,
            model: config.model,
            temperature: config.temperature,
            num_predict: config.num_predict,
            client,
        })
    }

    /// Validate endpoint URL for security (SSRF prevention)
    ///
    /// Only allows http/https schemes and warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            SpendError::FatalConfig(format!(
                "Invalid completion endpoint URL '{}': {}",
                endpoint, e
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SpendError::FatalConfig(format!(
                "Completion endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            warn!(
                "Completion endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse> {
        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending completion request"
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(&self.generate_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SpendError::transport(
                        &self.generate_url,
                        "connection refused. Is Ollama running? Start with: ollama serve",
                    )
                } else if e.is_timeout() {
                    SpendError::transport(&self.generate_url, format!("request timed out: {}", e))
                } else {
                    SpendError::transport(&self.generate_url, e.to_string())
                }
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SpendError::transport(
                &self.generate_url,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body: OllamaResponse = response.json().await.map_err(|e| {
            SpendError::transport(
                &self.generate_url,
                format!("Failed to decode response body: {}", e),
            )
        })?;

        let usage = TokenUsage::from_ollama(
            body.prompt_eval_count.unwrap_or(0),
            body.eval_count.unwrap_or(0),
        );

        info!(
            model = %self.model,
            elapsed_ms = elapsed.as_millis() as u64,
            output_tokens = usage.output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            text: body.response.unwrap_or_default(),
            usage,
            // total_duration is reported in nanoseconds
            timing: ResponseTiming::with_api_time(
                elapsed,
                body.total_duration.map(|ns| ns / 1_000_000),
            ),
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.generate_url
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}{}", self.api_base, TAGS_PATH);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(tags) = resp.json::<OllamaTagsResponse>().await {
                    let base_name = self.model.trim_end_matches(":latest");
                    let model_available = tags
                        .models
                        .iter()
                        .any(|m| m.name == self.model || m.name.starts_with(base_name));

                    if model_available {
                        info!("Ollama is available with model: {}", self.model);
                        Ok(true)
                    } else {
                        warn!(
                            "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                            self.model, self.model
                        );
                        Ok(false)
                    }
                } else {
                    info!("Ollama is available");
                    Ok(true)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}
