//! Extraction result and per-run metadata

use crate::{FieldCandidate, FieldSource, PipelineState, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The resolved fields of one document, in schema order
///
/// This is the unit stored in the result cache. It holds nothing that varies
/// between runs (timings and call counts live in [`PipelineMetadata`]), so a
/// cache replay is identical to the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Document-type identifier the request carried
    pub label: String,

    /// One candidate per requested field, in schema order
    pub fields: Vec<FieldCandidate>,
}

impl ExtractionResult {
    /// Candidate for `field`
    pub fn get(&self, field: &str) -> Option<&FieldCandidate> {
        self.fields.iter().find(|c| c.field == field)
    }

    /// Final value for `field`; `None` for null or unknown fields
    pub fn value(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|c| c.value.as_deref())
    }

    /// Field → final value mapping
    pub fn values(&self) -> BTreeMap<&str, Option<&str>> {
        self.fields
            .iter()
            .map(|c| (c.field.as_str(), c.value.as_deref()))
            .collect()
    }

    /// Whether the result holds exactly the fields of `schema`
    pub fn covers_exactly(&self, schema: &Schema) -> bool {
        self.fields.len() == schema.len()
            && self
                .fields
                .iter()
                .zip(schema.fields())
                .all(|(candidate, spec)| candidate.field == spec.name)
    }

    /// Number of fields with a non-null value
    pub fn resolved_count(&self) -> usize {
        self.fields.iter().filter(|c| c.value.is_some()).count()
    }
}

/// Token usage reported by the semantic extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Model name, if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Prompt tokens
    pub prompt_tokens: u64,

    /// Completion tokens
    pub completion_tokens: u64,

    /// Total tokens
    pub total_tokens: u64,

    /// Time spent in the call (milliseconds)
    pub duration_ms: u64,
}

impl Usage {
    /// Fold another call's usage into this one
    pub fn accumulate(&mut self, other: &Usage) {
        if self.model.is_none() {
            self.model = other.model.clone();
        }
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.duration_ms += other.duration_ms;
    }
}

/// Diagnostics about one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Identifier of the run (UUIDv7)
    pub request_id: Uuid,

    /// Whether the result came from the cache
    pub cache_hit: bool,

    /// Semantic extractor invocations, batch and recovery together
    pub semantic_calls: usize,

    /// Semantic extractor invocations made by the recovery phase
    pub recovery_semantic_calls: usize,

    /// Transport/parse retries performed by the adapter
    pub semantic_retries: usize,

    /// Elapsed milliseconds per pipeline stage
    pub stage_timings_ms: BTreeMap<String, u64>,

    /// Elapsed milliseconds for the whole run
    pub total_ms: u64,

    /// Aggregated token usage
    pub usage: Usage,

    /// Degradation notes (adapter failures and the like)
    pub failures: Vec<String>,

    /// States visited, in order
    pub states: Vec<PipelineState>,
}

impl PipelineMetadata {
    /// Empty metadata for a new run
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            cache_hit: false,
            semantic_calls: 0,
            recovery_semantic_calls: 0,
            semantic_retries: 0,
            stage_timings_ms: BTreeMap::new(),
            total_ms: 0,
            usage: Usage::default(),
            failures: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Whether the adapter reported a degraded call
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// What the pipeline hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    /// Resolved fields
    pub result: ExtractionResult,

    /// Run diagnostics
    pub metadata: PipelineMetadata,
}

impl ExtractionResponse {
    /// Source to report for `field`: `cache` on a cache hit, else the
    /// candidate's own source
    pub fn effective_source(&self, field: &str) -> Option<FieldSource> {
        let candidate = self.result.get(field)?;
        if self.metadata.cache_hit {
            Some(FieldSource::Cache)
        } else {
            Some(candidate.source)
        }
    }
}
