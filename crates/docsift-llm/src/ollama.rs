//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with Ollama's generate endpoint
//! - JSON mode (`format: "json"`) so the model answers with an object
//! - Configurable endpoint, model, timeout and temperature
//! - Token usage taken from Ollama's eval counters
//!
//! Each `extract` call is exactly one HTTP request; retrying is left to the
//! caller.
//!
//! # Examples
//!
//! ```no_run
//! use docsift_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1").unwrap();
//! ```

use crate::parser::parse_field_values;
use crate::prompt::PromptBuilder;
use crate::LlmError;
use async_trait::async_trait;
use docsift_domain::traits::{SemanticExtractor, SemanticRequest, SemanticResponse};
use docsift_domain::Usage;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ollama API provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    temperature: Option<f32>,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with a custom request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint: String = endpoint.into();
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            temperature: None,
        })
    }

    /// Create a new Ollama provider with default settings
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt in JSON mode and return the raw model output
    async fn generate(&self, prompt: &str) -> Result<OllamaGenerateResponse, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<OllamaGenerateResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl SemanticExtractor for OllamaProvider {
    type Error = LlmError;

    async fn extract(&self, request: &SemanticRequest) -> Result<SemanticResponse, Self::Error> {
        let prompt = PromptBuilder::from_request(request).build();
        debug!(
            model = %self.model,
            fields = request.fields.len(),
            prompt_chars = prompt.len(),
            "calling ollama"
        );

        let started = Instant::now();
        let generated = self.generate(&prompt).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let names: Vec<&str> = request.field_names().collect();
        let values = parse_field_values(&generated.response, &names)?;

        let prompt_tokens = generated.prompt_eval_count.unwrap_or(0);
        let completion_tokens = generated.eval_count.unwrap_or(0);
        Ok(SemanticResponse {
            values,
            usage: Usage {
                model: Some(self.model.clone()),
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                duration_ms,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_domain::FieldSpec;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.1").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model(), "llama3.1");
        assert!(provider.temperature.is_none());
    }

    #[test]
    fn test_ollama_provider_default_endpoint() {
        let provider = OllamaProvider::default_endpoint("mistral")
            .unwrap()
            .with_temperature(0.0);
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.temperature, Some(0.0));
    }

    #[test]
    fn test_request_body_uses_json_mode() {
        let body = OllamaGenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: "json",
            options: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
    }

    // Integration tests (requires running Ollama)
    #[tokio::test]
    #[ignore] // Only run when Ollama is available
    async fn test_ollama_extract_integration() {
        let provider = OllamaProvider::default_endpoint(DEFAULT_MODEL).unwrap();
        let request = SemanticRequest {
            context: "Nome: Ana Souza".to_string(),
            label: "id-card".to_string(),
            fields: vec![FieldSpec::new("nome", "nome completo")],
            tables: vec![],
        };
        let result = provider.extract(&request).await;
        if let Ok(response) = result {
            assert!(response.values.len() <= 1);
        }
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        // Unroutable port: the request must fail without panicking
        let provider = OllamaProvider::with_timeout(
            "http://127.0.0.1:9",
            "llama3.1",
            Duration::from_millis(500),
        )
        .unwrap();
        let request = SemanticRequest {
            context: "ctx".to_string(),
            label: "l".to_string(),
            fields: vec![FieldSpec::new("a", "b")],
            tables: vec![],
        };

        let result = provider.extract(&request).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
