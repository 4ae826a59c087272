//! Core Orchestrator implementation
//!
//! Drives one request through the pipeline states and owns the single
//! commit point where the learner and the cache are written.

use crate::adapter::{BatchOutcome, SemanticAdapter};
use crate::config::ExtractorConfig;
use crate::context::ContextBuilder;
use crate::error::ExtractorError;
use crate::heuristics::{self, HeuristicOutcome};
use crate::recovery::{RecoveryEngine, RecoveryInput, RecoveryReport};
use docsift_domain::traits::{SemanticExtractor, SemanticRequest};
use docsift_domain::{
    ExtractionOptions, ExtractionRequest, ExtractionResponse, ExtractionResult,
    FieldCandidate, FieldSource, FieldSpec, PipelineMetadata, PipelineState, Schema, SchemaError,
    TableRow, ValidationStatus,
};
use docsift_gatekeeper::{ConfidenceScorer, Gatekeeper, Verdict};
use docsift_store::{CacheKey, LabelProfile, ResultCache, SchemaLearner};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Tracks the current state, stage timings and metadata of one run
struct Run {
    state: PipelineState,
    metadata: PipelineMetadata,
    started: Instant,
    stage_started: Instant,
}

impl Run {
    fn new(request_id: Uuid) -> Self {
        let now = Instant::now();
        let mut metadata = PipelineMetadata::new(request_id);
        metadata.states.push(PipelineState::Init);
        Self {
            state: PipelineState::Init,
            metadata,
            started: now,
            stage_started: now,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            self.state,
            next
        );
        let elapsed = self.stage_started.elapsed().as_millis() as u64;
        *self
            .metadata
            .stage_timings_ms
            .entry(self.state.as_str().to_string())
            .or_insert(0) += elapsed;
        debug!(from = %self.state, to = %next, elapsed_ms = elapsed, "pipeline transition");

        self.state = next;
        self.metadata.states.push(next);
        self.stage_started = Instant::now();
    }

    /// Record one logical semantic call
    fn record_call(&mut self, outcome: &BatchOutcome) {
        self.metadata.semantic_calls += 1;
        self.metadata.semantic_retries += outcome.attempts.saturating_sub(1);
        self.metadata.usage.accumulate(&outcome.usage);
        if let Some(failure) = &outcome.failure {
            self.metadata.failures.push(failure.clone());
        }
    }

    fn fail(mut self, error: ExtractorError) -> ExtractorError {
        self.advance(PipelineState::Error);
        warn!(error = %error, "request rejected");
        error
    }

    fn finish(mut self) -> PipelineMetadata {
        self.metadata.total_ms = self.started.elapsed().as_millis() as u64;
        self.metadata
    }
}

/// Where a field stands after the heuristic pass
enum Pending {
    /// Final, from the heuristic pass
    Resolved(FieldCandidate),
    /// Needs the semantic batch
    Unresolved {
        /// Heuristic value kept in case the batch brings nothing usable
        fallback: Option<FieldCandidate>,
    },
}

/// The Orchestrator resolves the fields of a request, cheapest strategy first
///
/// ```text
/// cache ─▶ heuristics ─▶ one semantic batch ─▶ validation ─▶ recovery ─▶ merge
///                                                                        │
///                                         cache write ◀─ learner update ◀┘
/// ```
pub struct Orchestrator<L>
where
    L: SemanticExtractor,
{
    adapter: SemanticAdapter<L>,
    cache: Arc<ResultCache>,
    learner: Arc<SchemaLearner>,
    gatekeeper: Gatekeeper,
    config: ExtractorConfig,
}

impl<L> Orchestrator<L>
where
    L: SemanticExtractor + 'static,
{
    /// Create an Orchestrator over shared stores
    pub fn new(
        extractor: L,
        cache: Arc<ResultCache>,
        learner: Arc<SchemaLearner>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            adapter: SemanticAdapter::new(Arc::new(extractor)),
            gatekeeper: Gatekeeper::new(config.validation.clone()),
            cache,
            learner,
            config,
        }
    }

    /// Create an Orchestrator with fresh stores sized by `config`
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn from_config(extractor: L, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate()?;
        let cache = ResultCache::new(config.cache_capacity)
            .map_err(|e| ExtractorError::Config(e.to_string()))?;
        let learner = SchemaLearner::new(
            config.max_labels,
            config.max_example_len,
            config.max_fields_per_label,
        )
        .map_err(|e| ExtractorError::Config(e.to_string()))?;
        Ok(Self::new(extractor, Arc::new(cache), Arc::new(learner), config))
    }

    /// Shared result cache
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Shared schema learner
    pub fn learner(&self) -> &Arc<SchemaLearner> {
        &self.learner
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The semantic extractor behind the adapter
    pub fn extractor(&self) -> &Arc<L> {
        self.adapter.extractor()
    }

    /// Resolve every field of `request`
    ///
    /// Only malformed input is an error. The response always holds exactly
    /// the schema's fields, in schema order; fields nothing could resolve
    /// are null with a source telling why.
    ///
    /// # Errors
    /// Returns error for a blank label, an empty schema, an empty document,
    /// a document above `max_document_chars` or unusable options
    pub async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResponse, ExtractorError> {
        let request_id = Uuid::now_v7();
        let span = info_span!("extract", request_id = %request_id, label = %request.label);
        self.run(request_id, request).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: ExtractionRequest,
    ) -> Result<ExtractionResponse, ExtractorError> {
        let mut run = Run::new(request_id);

        if let Err(e) = self.check_input(&request) {
            return Err(run.fail(e));
        }

        let ExtractionRequest {
            label,
            schema,
            text,
            tables,
            options,
        } = request;
        info!(
            fields = schema.len(),
            text_chars = text.chars().count(),
            table_rows = tables.len(),
            "starting extraction"
        );

        run.advance(PipelineState::CacheCheck);
        let text: Arc<str> = Arc::from(text);
        let key = self.cache_key(&label, &text, &tables, &schema).await;
        if let Some(cached) = self.cache.get(&key) {
            // The key ignores field order; a result for other fields would
            // break completeness
            match align(cached, &schema) {
                Some(result) => {
                    run.metadata.cache_hit = true;
                    run.advance(PipelineState::Done);
                    info!(resolved = result.resolved_count(), "cache hit");
                    return Ok(ExtractionResponse {
                        result,
                        metadata: run.finish(),
                    });
                }
                None => warn!(key = %key, "cached result does not match schema, recomputing"),
            }
        }

        // Learned hints are read once; the learner is only written at commit
        let profile = self.learner.snapshot(&label);

        run.advance(PipelineState::Heuristics);
        let corpus: Arc<str> = match heuristics::corpus(&text, &tables) {
            std::borrow::Cow::Borrowed(_) => Arc::clone(&text),
            std::borrow::Cow::Owned(corpus) => Arc::from(corpus),
        };
        let outcomes: Vec<HeuristicOutcome> = schema
            .fields()
            .iter()
            .map(|field| heuristics::resolve(field, &corpus))
            .collect();

        run.advance(PipelineState::Partition);
        let mut pending: Vec<Pending> = schema
            .fields()
            .iter()
            .zip(&outcomes)
            .map(|(field, outcome)| self.partition(field, outcome))
            .collect();
        let unresolved: Vec<FieldSpec> = schema
            .fields()
            .iter()
            .zip(&pending)
            .filter(|(_, p)| matches!(p, Pending::Unresolved { .. }))
            .map(|(field, _)| field.clone())
            .collect();
        debug!(
            resolved = schema.len() - unresolved.len(),
            unresolved = unresolved.len(),
            "heuristic partition"
        );

        run.advance(PipelineState::SemanticBatch);
        let batch = if unresolved.is_empty() {
            BatchOutcome::default()
        } else {
            let hints = example_hints(&unresolved, profile.as_ref());
            let context = ContextBuilder::new(self.config.context_window_radius).build(
                &text,
                &unresolved,
                &hints,
                options.context_budget,
            );
            let outcome = self
                .adapter
                .invoke(&SemanticRequest {
                    context,
                    label: label.clone(),
                    fields: unresolved.clone(),
                    tables: tables.clone(),
                })
                .await;
            run.record_call(&outcome);
            outcome
        };

        run.advance(PipelineState::Validate);
        let verdicts: Vec<Option<Verdict>> = schema
            .fields()
            .iter()
            .zip(&pending)
            .map(|(field, p)| match p {
                Pending::Unresolved { .. } => Some(self.gatekeeper.validate(
                    &field.name,
                    batch.value(&field.name),
                    &field.description,
                )),
                Pending::Resolved(_) => None,
            })
            .collect();

        run.advance(PipelineState::Partition2);
        let mut recovering: Vec<FieldSpec> = Vec::new();
        for ((field, slot), verdict) in schema.fields().iter().zip(pending.iter_mut()).zip(verdicts) {
            let (Pending::Unresolved { fallback }, Some(verdict)) = (&mut *slot, verdict) else {
                continue;
            };
            let learned = profile
                .as_ref()
                .and_then(|p| p.example(&field.name))
                .is_some();

            let settled = match verdict {
                Verdict::Accepted(Some(value)) => Some(FieldCandidate {
                    confidence: ConfidenceScorer::score(
                        &field.name,
                        Some(value.as_str()),
                        &field.description,
                        FieldSource::Llm,
                        true,
                    ),
                    field: field.name.clone(),
                    value: Some(value),
                    source: FieldSource::Llm,
                    validation: ValidationStatus::Accepted,
                }),
                _ if fallback.is_some() => fallback.take(),
                Verdict::Accepted(None) if !learned => Some(FieldCandidate::null(
                    field.name.clone(),
                    if batch.is_degraded() {
                        FieldSource::Llm
                    } else {
                        FieldSource::Null
                    },
                )),
                Verdict::Accepted(None) | Verdict::Rejected(_) => None,
            };

            match settled {
                Some(candidate) => *slot = Pending::Resolved(candidate),
                None => recovering.push(field.clone()),
            }
        }

        run.advance(PipelineState::Recovery);
        let report = if recovering.is_empty() {
            RecoveryReport::default()
        } else {
            debug!(fields = recovering.len(), "entering recovery");
            self.recovery_engine(&options)
                .recover(RecoveryInput {
                    label: label.clone(),
                    text: Arc::clone(&text),
                    corpus: Arc::clone(&corpus),
                    tables: tables.clone(),
                    profile: profile.clone(),
                    fields: recovering,
                })
                .await
        };
        if report.semantic_dispatched {
            run.metadata.recovery_semantic_calls += 1;
            match &report.semantic {
                Some(outcome) => run.record_call(outcome),
                None => run.metadata.semantic_calls += 1,
            }
        }
        let mut recovered = report.candidates;

        run.advance(PipelineState::Merge);
        let fields: Vec<FieldCandidate> = schema
            .fields()
            .iter()
            .zip(pending)
            .map(|(field, p)| match p {
                Pending::Resolved(candidate) => candidate,
                Pending::Unresolved { .. } => recovered
                    .remove(&field.name)
                    .unwrap_or_else(|| FieldCandidate::unresolved(field.name.clone(), FieldSource::RecoveryExhausted)),
            })
            .collect();
        for candidate in fields.iter().filter(|c| c.source == FieldSource::Timeout) {
            run.metadata
                .failures
                .push(format!("recovery of '{}' timed out", candidate.field));
        }
        let result = ExtractionResult {
            label: label.clone(),
            fields,
        };

        run.advance(PipelineState::Learn);
        match self.learner.learn(&label, &schema, &result.fields) {
            Ok(learned) => debug!(learned, "learner updated"),
            Err(e) => warn!(error = %e, "learner update skipped"),
        }

        run.advance(PipelineState::CacheStore);
        if run.metadata.is_degraded() {
            debug!(
                failures = run.metadata.failures.len(),
                "degraded run, not caching"
            );
        } else if let Err(e) = self.cache.put(key, &result) {
            warn!(error = %e, "cache write skipped");
        }

        run.advance(PipelineState::Done);
        let metadata = run.finish();
        info!(
            resolved = result.resolved_count(),
            fields = result.fields.len(),
            semantic_calls = metadata.semantic_calls,
            total_ms = metadata.total_ms,
            "extraction complete"
        );
        Ok(ExtractionResponse { result, metadata })
    }

    fn check_input(&self, request: &ExtractionRequest) -> Result<(), ExtractorError> {
        if request.label.trim().is_empty() {
            return Err(ExtractorError::EmptyLabel);
        }
        if request.schema.is_empty() {
            return Err(ExtractorError::InvalidSchema(SchemaError::Empty));
        }
        if request.text.trim().is_empty() && request.tables.is_empty() {
            return Err(ExtractorError::EmptyDocument);
        }
        let chars = request.text.chars().count();
        if chars > self.config.max_document_chars {
            return Err(ExtractorError::TextTooLong(
                chars,
                self.config.max_document_chars,
            ));
        }
        check_options(&request.options)
    }

    /// Hash inline, or off the async workers for large documents
    async fn cache_key(
        &self,
        label: &str,
        text: &Arc<str>,
        tables: &[TableRow],
        schema: &Schema,
    ) -> CacheKey {
        if text.len() <= self.config.offload_threshold_bytes {
            return CacheKey::derive(label, text, tables, schema);
        }

        let (owned_label, owned_text, owned_tables, owned_schema) = (
            label.to_string(),
            Arc::clone(text),
            tables.to_vec(),
            schema.clone(),
        );
        let hashed = tokio::task::spawn_blocking(move || {
            CacheKey::derive(&owned_label, &owned_text, &owned_tables, &owned_schema)
        })
        .await;
        match hashed {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "offloaded hashing failed, hashing inline");
                CacheKey::derive(label, text, tables, schema)
            }
        }
    }

    /// Heuristic outcome → settled or pending field
    fn partition(&self, field: &FieldSpec, outcome: &HeuristicOutcome) -> Pending {
        let HeuristicOutcome::Matched {
            value, confidence, ..
        } = outcome
        else {
            return Pending::Unresolved { fallback: None };
        };

        let candidate = match self
            .gatekeeper
            .validate(&field.name, Some(value.as_str()), &field.description)
        {
            Verdict::Accepted(Some(normalized)) => FieldCandidate::accepted(
                field.name.clone(),
                normalized,
                FieldSource::Heuristic,
                *confidence,
            ),
            _ => {
                debug!(field = %field.name, "heuristic match failed validation");
                return Pending::Unresolved { fallback: None };
            }
        };

        if ConfidenceScorer::should_escalate(*confidence, &field.name) {
            debug!(
                field = %field.name,
                confidence = %confidence,
                "heuristic match below threshold, escalating"
            );
            Pending::Unresolved {
                fallback: Some(candidate),
            }
        } else {
            Pending::Resolved(candidate)
        }
    }

    fn recovery_engine(&self, options: &ExtractionOptions) -> RecoveryEngine<L> {
        let radius = self
            .config
            .context_window_radius
            .saturating_mul(self.config.recovery_context_multiplier);
        RecoveryEngine::new(
            self.adapter.clone(),
            self.gatekeeper.clone(),
            ContextBuilder::new(radius),
            options.context_budget,
            options.max_recovery_fanout,
            options.field_timeout,
        )
    }
}

fn check_options(options: &ExtractionOptions) -> Result<(), ExtractorError> {
    if options.context_budget == 0 {
        return Err(ExtractorError::Config(
            "context_budget must be greater than 0".to_string(),
        ));
    }
    if options.max_recovery_fanout == 0 {
        return Err(ExtractorError::Config(
            "max_recovery_fanout must be greater than 0".to_string(),
        ));
    }
    if options.field_timeout.is_zero() {
        return Err(ExtractorError::Config(
            "field_timeout must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// `result` with its fields in `schema` order, if it holds exactly those fields
fn align(mut result: ExtractionResult, schema: &Schema) -> Option<ExtractionResult> {
    if result.fields.len() != schema.len() {
        return None;
    }
    let mut by_name: HashMap<String, FieldCandidate> = result
        .fields
        .drain(..)
        .map(|candidate| (candidate.field.clone(), candidate))
        .collect();
    result.fields = schema
        .names()
        .map(|name| by_name.remove(name))
        .collect::<Option<Vec<_>>>()?;
    Some(result)
}

fn example_hints<'a>(fields: &[FieldSpec], profile: Option<&'a LabelProfile>) -> Vec<&'a str> {
    let Some(profile) = profile else {
        return Vec::new();
    };
    fields
        .iter()
        .filter_map(|f| profile.example(&f.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_domain::Confidence;
    use docsift_llm::MockProvider;

    fn orchestrator(mock: &MockProvider) -> Orchestrator<MockProvider> {
        Orchestrator::from_config(mock.clone(), ExtractorConfig::default()).unwrap()
    }

    fn request(pairs: &[(&str, &str)], text: &str) -> ExtractionRequest {
        ExtractionRequest::new("id-card", Schema::from_pairs(pairs.iter().copied()).unwrap(), text)
    }

    #[tokio::test]
    async fn test_states_of_a_miss() {
        let mock = MockProvider::new();
        let response = orchestrator(&mock)
            .extract(request(&[("cpf", "documento CPF")], "CPF: 123.456.789-00"))
            .await
            .unwrap();

        use PipelineState::*;
        assert_eq!(
            response.metadata.states,
            vec![
                Init, CacheCheck, Heuristics, Partition, SemanticBatch, Validate, Partition2,
                Recovery, Merge, Learn, CacheStore, Done
            ]
        );
        assert!(response.metadata.stage_timings_ms.contains_key("heuristics"));
    }

    #[tokio::test]
    async fn test_states_of_a_hit() {
        let mock = MockProvider::new();
        let orchestrator = orchestrator(&mock);
        let req = request(&[("cpf", "documento CPF")], "CPF: 123.456.789-00");
        orchestrator.extract(req.clone()).await.unwrap();
        let response = orchestrator.extract(req).await.unwrap();

        assert!(response.metadata.cache_hit);
        assert_eq!(
            response.metadata.states,
            vec![PipelineState::Init, PipelineState::CacheCheck, PipelineState::Done]
        );
        assert_eq!(response.effective_source("cpf"), Some(FieldSource::Cache));
    }

    #[tokio::test]
    async fn test_input_errors_end_in_error_state() {
        let mock = MockProvider::new();
        let orchestrator = orchestrator(&mock);

        let mut blank_label = request(&[("cpf", "")], "CPF: 1");
        blank_label.label = "  ".to_string();
        assert_eq!(
            orchestrator.extract(blank_label).await,
            Err(ExtractorError::EmptyLabel)
        );

        assert_eq!(
            orchestrator.extract(request(&[("cpf", "")], "   ")).await,
            Err(ExtractorError::EmptyDocument)
        );

        let mut zero_fanout = request(&[("cpf", "")], "CPF: 1");
        zero_fanout.options.max_recovery_fanout = 0;
        assert!(matches!(
            orchestrator.extract(zero_fanout).await,
            Err(ExtractorError::Config(_))
        ));

        assert!(orchestrator.cache().is_empty());
        assert!(orchestrator.learner().is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_text_too_long() {
        let mock = MockProvider::new();
        let config = ExtractorConfig {
            max_document_chars: 10,
            context_budget_chars: 5,
            ..ExtractorConfig::default()
        };
        let orchestrator = Orchestrator::from_config(mock, config).unwrap();
        let result = orchestrator
            .extract(request(&[("cpf", "")], "01234567890"))
            .await;
        assert_eq!(result, Err(ExtractorError::TextTooLong(11, 10)));
    }

    #[tokio::test]
    async fn test_escalated_match_falls_back_to_heuristic() {
        // A bare digit run is too weak to settle alone, so the batch is asked
        let mock = MockProvider::new().with_null("numero");
        let response = orchestrator(&mock)
            .extract(request(&[("numero", "número do documento")], "Número 12345678"))
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 1);
        let candidate = response.result.get("numero").unwrap();
        assert_eq!(candidate.value.as_deref(), Some("12345678"));
        assert_eq!(candidate.source, FieldSource::Heuristic);
        assert_eq!(candidate.confidence, Confidence::new(0.60));
    }

    #[tokio::test]
    async fn test_escalated_match_prefers_valid_batch_value() {
        let mock = MockProvider::new().with_value("numero", "87654321");
        let response = orchestrator(&mock)
            .extract(request(&[("numero", "número do documento")], "Número 12345678"))
            .await
            .unwrap();
        let candidate = response.result.get("numero").unwrap();
        assert_eq!(candidate.value.as_deref(), Some("87654321"));
        assert_eq!(candidate.source, FieldSource::Llm);
    }

    #[tokio::test]
    async fn test_usage_aggregated() {
        let mock = MockProvider::new().with_value("nome", "Ana Souza");
        let response = orchestrator(&mock)
            .extract(request(&[("nome", "nome completo")], "Nome: Ana Souza"))
            .await
            .unwrap();
        assert_eq!(response.metadata.semantic_calls, 1);
        assert_eq!(response.metadata.usage.model.as_deref(), Some("mock"));
        assert!(response.metadata.usage.total_tokens > 0);
    }
}
