use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{compose_prompt, status_error, transport_error, Provider};

/// Gemini client for the Generative Language REST API
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key sent in the `x-goog-api-key` header
    api_key: String,
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    endpoint: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One conversation turn
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

impl GenerateContentRequest {
    /// Single user turn with the given text
    pub fn from_text(text: impl Into<String>, temperature: f32) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: text.into() }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(temperature),
                max_output_tokens: None,
            }),
        }
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            temperature,
        }
    }

    /// URL of the generateContent method for the configured model
    pub fn generate_url(&self) -> Result<Url, ProviderError> {
        let base = format!("{}/", self.endpoint.trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini endpoint '{}': {}", self.endpoint, e)))?;

        base.join(&format!("models/{}:generateContent", self.model))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini model '{}': {}", self.model, e)))
    }

    /// Send a generateContent request
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse, ProviderError> {
        let url = self.generate_url()?;
        debug!("Sending Gemini request to {}", url);

        let response = self.client.post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(status_error("Gemini", status, error_text));
        }

        response.json::<GenerateContentResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Gemini response: {}", e)))
    }

    /// Extract text from the first candidate
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> String {
        response.candidates.first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for Gemini {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest::from_text(compose_prompt(instructions, input), self.temperature);
        let response = self.generate(&request).await?;
        Ok(Self::extract_text_from_response(&response))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = GenerateContentRequest::from_text("Hello", self.temperature);
        self.generate(&request).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}
