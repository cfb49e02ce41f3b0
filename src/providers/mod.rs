/*!
 * Provider implementations for the name inversion oracle.
 *
 * This module contains client implementations for the supported LLM services:
 * - Gemini: Google Generative Language API (default)
 * - Ollama: Local LLM server
 * - Anthropic: Anthropic API integration
 * - Mock: scripted replies for tests
 */

use async_trait::async_trait;
use log::warn;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{OracleConfig, OracleProvider};
use crate::errors::ProviderError;

/// Common trait for all oracle providers
///
/// Implementations must be usable as trait objects so the pipeline can
/// receive whichever one the configuration selects.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send `instructions` followed by `input` and return the reply text
    ///
    /// # Arguments
    /// * `instructions` - Fixed instructions for the model
    /// * `input` - The payload the instructions apply to
    async fn complete(&self, instructions: &str, input: &str) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human readable provider name for logs
    fn name(&self) -> &str;
}

/// Single prompt sent to providers that take one text block
pub fn compose_prompt(instructions: &str, input: &str) -> String {
    format!("{}\n\n{}", instructions.trim_end(), input)
}

/// Map a reqwest transport error onto the provider error kinds
pub(crate) fn transport_error(service: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", service, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", service, error))
    }
}

/// Map a non-success HTTP status onto the provider error kinds
pub(crate) fn status_error(service: &str, status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(format!("{} rejected the credentials: {}", service, body)),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Build the configured oracle, or `None` when it cannot be used
pub fn build_provider(config: &OracleConfig) -> Option<Arc<dyn Provider>> {
    if !config.enabled {
        return None;
    }

    if !config.is_usable() {
        warn!(
            "No API key configured for {}; name normalization will be skipped",
            config.provider.display_name()
        );
        return None;
    }

    let provider: Arc<dyn Provider> = match config.provider {
        OracleProvider::Gemini => Arc::new(gemini::Gemini::new(
            config.api_key.clone(),
            config.get_endpoint(),
            config.get_model(),
            config.temperature,
            config.timeout_secs,
        )),
        OracleProvider::Ollama => Arc::new(ollama::Ollama::from_url(
            config.get_endpoint(),
            config.get_model(),
            config.temperature,
            config.timeout_secs,
        )),
        OracleProvider::Anthropic => Arc::new(anthropic::Anthropic::new(
            config.api_key.clone(),
            config.get_endpoint(),
            config.get_model(),
            config.temperature,
            config.timeout_secs,
        )),
    };

    Some(provider)
}

pub mod gemini;
pub mod ollama;
pub mod anthropic;
pub mod mock;
