use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use log::{error, warn};

use crate::errors::ProviderError;
use crate::providers::{compose_prompt, status_error, transport_error, Provider};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    model: String,
    temperature: f32,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generate response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: None,
            stream: Some(false),
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client from a complete URL
    pub fn from_url(url: impl Into<String>, model: impl Into<String>, temperature: f32, timeout_secs: u64) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                // Ollama uses HTTP/1.1
                .http1_only()
                .build()
                .unwrap_or_default(),
            model: model.into(),
            temperature,
            max_retries: 2,
            backoff_base_ms: 1000,
        }
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.client.post(&url).json(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let response_text = response.text().await
                            .map_err(|e| transport_error("Ollama", e))?;
                        return Self::parse_generation(&response_text);
                    }

                    let error_text = response.text().await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    if !status.is_server_error() {
                        // Client error - don't retry
                        error!("Ollama API error ({}): {}", status, error_text);
                        return Err(status_error("Ollama", status, error_text));
                    }

                    warn!("Ollama API error ({}): {} - attempt {}/{}", status, error_text, attempt + 1, self.max_retries + 1);
                    last_error = Some(status_error("Ollama", status, error_text));
                }
                Err(e) => {
                    warn!("Ollama API network error: {} - attempt {}/{}", e, attempt + 1, self.max_retries + 1);
                    last_error = Some(transport_error("Ollama", e));
                }
            }

            attempt += 1;

            // If we have more retries left, wait with exponential backoff
            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!("Ollama request failed after {} attempts", self.max_retries + 1))
        }))
    }

    /// Parse a generate reply, accepting both a single object and JSONL chunks
    pub fn parse_generation(body: &str) -> Result<GenerationResponse, ProviderError> {
        if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
            return Ok(response);
        }

        // Streaming replies arrive as one JSON object per line
        let mut chunks = Vec::new();
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let chunk = serde_json::from_str::<GenerationResponse>(line)
                .map_err(|e| ProviderError::ParseError(format!("Ollama response: {}", e)))?;
            chunks.push(chunk);
        }

        if chunks.is_empty() {
            return Err(ProviderError::ParseError("Ollama returned an empty body".to_string()));
        }

        Ok(GenerationResponse {
            model: chunks[0].model.clone(),
            response: chunks.iter().map(|c| c.response.as_str()).collect(),
            done: chunks.iter().any(|c| c.done),
        })
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(&self.model, compose_prompt(instructions, input))
            .temperature(self.temperature);
        Ok(self.generate(&request).await?.response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(status_error("Ollama", status, body))
        }
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
