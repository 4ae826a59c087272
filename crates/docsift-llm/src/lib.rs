//! docsift LLM Provider Layer
//!
//! Implementations of the [`SemanticExtractor`] collaborator trait from
//! `docsift-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: scripted, deterministic provider for tests and dry runs
//! - `OllamaProvider`: local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use docsift_domain::traits::{SemanticExtractor, SemanticRequest};
//! use docsift_domain::FieldSpec;
//! use docsift_llm::MockProvider;
//!
//! # tokio_test::block_on(async {
//! let provider = MockProvider::new().with_value("nome", "Ana Souza");
//! let request = SemanticRequest {
//!     context: "Nome: Ana Souza".to_string(),
//!     label: "id-card".to_string(),
//!     fields: vec![FieldSpec::new("nome", "nome completo")],
//!     tables: vec![],
//! };
//! let response = provider.extract(&request).await.unwrap();
//! assert_eq!(response.values["nome"].as_deref(), Some("Ana Souza"));
//! assert_eq!(provider.call_count(), 1);
//! # });
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod parser;
pub mod prompt;

use async_trait::async_trait;
use docsift_domain::traits::{SemanticExtractor, SemanticRequest, SemanticResponse};
use docsift_domain::Usage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;
pub use parser::parse_field_values;
pub use prompt::PromptBuilder;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One scripted answer: field values, or a failure
type Scripted = Result<HashMap<String, Option<String>>, LlmError>;

#[derive(Debug, Default)]
struct MockState {
    /// Answers consumed one per call, before falling back to defaults
    script: VecDeque<Scripted>,
    /// Calls that fail before any answer is produced
    failures_left: usize,
    calls: Vec<SemanticRequest>,
}

/// Mock semantic provider for deterministic testing
///
/// Answers each call from, in order: a pending scripted failure, the next
/// scripted answer, or the default field values. Only requested fields are
/// returned; a requested field with no value is simply omitted. Clones share
/// their script and call log.
///
/// # Examples
///
/// ```
/// use docsift_llm::MockProvider;
/// use std::collections::HashMap;
///
/// let provider = MockProvider::new()
///     .with_value("cpf", "123.456.789-00")
///     .then_answer(HashMap::from([("cpf".to_string(), None)]))
///     .fail_times(1);
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    defaults: HashMap<String, Option<String>>,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a provider with no default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default value returned for `field`
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(field.into(), Some(value.into()));
        self
    }

    /// Explicit null returned for `field`
    pub fn with_null(mut self, field: impl Into<String>) -> Self {
        self.defaults.insert(field.into(), None);
        self
    }

    /// Sleep this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a one-shot answer for the next unscripted call
    pub fn then_answer(self, values: HashMap<String, Option<String>>) -> Self {
        self.state().script.push_back(Ok(values));
        self
    }

    /// Queue a one-shot failure
    pub fn then_fail(self, error: LlmError) -> Self {
        self.state().script.push_back(Err(error));
        self
    }

    /// Fail the next `n` calls with a communication error
    pub fn fail_times(self, n: usize) -> Self {
        self.state().failures_left = n;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the number of times extract was called
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Requests received so far, in call order
    pub fn calls(&self) -> Vec<SemanticRequest> {
        self.state().calls.clone()
    }

    /// Reset the call log
    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl SemanticExtractor for MockProvider {
    type Error = LlmError;

    async fn extract(&self, request: &SemanticRequest) -> Result<SemanticResponse, Self::Error> {
        let scripted = {
            let mut state = self.state();
            state.calls.push(request.clone());
            if state.failures_left > 0 {
                state.failures_left -= 1;
                Some(Err(LlmError::Communication("mock failure".to_string())))
            } else {
                state.script.pop_front()
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let source = match scripted {
            Some(Err(e)) => return Err(e),
            Some(Ok(values)) => values,
            None => self.defaults.clone(),
        };

        let values: HashMap<String, Option<String>> = request
            .field_names()
            .filter_map(|name| source.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();

        let prompt_tokens = (request.context.chars().count() / 4) as u64;
        let completion_tokens = (values.len() * 8) as u64;
        Ok(SemanticResponse {
            values,
            usage: Usage {
                model: Some("mock".to_string()),
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                duration_ms: self.delay.map_or(0, |d| d.as_millis() as u64),
            },
        })
    }
}
