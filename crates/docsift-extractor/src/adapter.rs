//! Semantic Extractor Adapter
//!
//! Wraps one logical call to the semantic collaborator: a failed attempt is
//! retried once, and a second failure degrades every requested field to
//! null instead of failing the request.

use docsift_domain::traits::{SemanticExtractor, SemanticRequest};
use docsift_domain::{FieldSpec, Usage};
use docsift_store::LabelProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attempts made for one logical call
const MAX_ATTEMPTS: usize = 2;

/// What one logical semantic call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Every requested field; fields the collaborator skipped are null
    pub values: HashMap<String, Option<String>>,

    /// Usage of the successful attempt
    pub usage: Usage,

    /// Attempts made (0 when nothing was requested)
    pub attempts: usize,

    /// Why the call degraded, if it did
    pub failure: Option<String>,
}

impl BatchOutcome {
    /// Value returned for `field`
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.as_deref())
    }

    /// Whether every attempt failed
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Adapter around a shared [`SemanticExtractor`]
pub struct SemanticAdapter<L> {
    extractor: Arc<L>,
}

impl<L> Clone for SemanticAdapter<L> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<L: SemanticExtractor> SemanticAdapter<L> {
    /// Wrap a shared extractor
    pub fn new(extractor: Arc<L>) -> Self {
        Self { extractor }
    }

    /// The wrapped extractor
    pub fn extractor(&self) -> &Arc<L> {
        &self.extractor
    }

    /// Make one logical call for `request.fields`
    ///
    /// Never fails: transport and parse errors are retried once, then
    /// reported through [`BatchOutcome::failure`] with all fields null.
    pub async fn invoke(&self, request: &SemanticRequest) -> BatchOutcome {
        let mut values: HashMap<String, Option<String>> =
            request.field_names().map(|name| (name.to_string(), None)).collect();
        if values.is_empty() {
            return BatchOutcome::default();
        }

        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.extractor.extract(request).await {
                Ok(response) => {
                    for (field, value) in response.values {
                        if let Some(slot) = values.get_mut(&field) {
                            *slot = value;
                        }
                    }
                    debug!(
                        attempt,
                        fields = values.len(),
                        tokens = response.usage.total_tokens,
                        "semantic call answered"
                    );
                    return BatchOutcome {
                        values,
                        usage: response.usage,
                        attempts: attempt,
                        failure: None,
                    };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "semantic call failed");
                    last_error = e.to_string();
                }
            }
        }

        BatchOutcome {
            values,
            usage: Usage::default(),
            attempts: MAX_ATTEMPTS,
            failure: Some(format!(
                "semantic extraction failed after {} attempts: {}",
                MAX_ATTEMPTS, last_error
            )),
        }
    }
}

/// `fields` with learned examples appended to their descriptions
///
/// The example only shows the shape of an earlier value; the model is told
/// so in the prompt.
pub fn hinted_fields(fields: &[FieldSpec], profile: Option<&LabelProfile>) -> Vec<FieldSpec> {
    fields
        .iter()
        .map(|field| match profile.and_then(|p| p.example(&field.name)) {
            Some(example) => FieldSpec::new(
                field.name.clone(),
                format!("{} (previous example: {})", field.description, example),
            ),
            None => field.clone(),
        })
        .collect()
}
