//! Recovery Engine
//!
//! Fields the cheap passes could not settle get three more chances, raced
//! per field under a wall-clock cap:
//!
//! 1. a relaxed pattern search anchored on the field name,
//! 2. the shape of a previously learned example,
//! 3. one combined semantic call shared by every recovering field.
//!
//! The first accepted value wins; on a tie the strategies are preferred in
//! that order. Whatever wins is still checked by the validator.

use crate::adapter::{hinted_fields, BatchOutcome, SemanticAdapter};
use crate::context::ContextBuilder;
use docsift_domain::traits::{SemanticExtractor, SemanticRequest};
use docsift_domain::{FieldCandidate, FieldSource, FieldSpec, TableRow, ValidationStatus};
use docsift_gatekeeper::{ConfidenceScorer, Gatekeeper, Verdict};
use docsift_patterns::{categories_for, tokenize, NormalizedText};
use docsift_store::LabelProfile;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Characters after a field-name anchor considered part of its value
const MAX_ANCHOR_TAIL_CHARS: usize = 160;

type SharedOutcome = Option<Arc<BatchOutcome>>;

/// Everything one recovery phase reads; immutable for its duration
pub struct RecoveryInput {
    /// Document-type identifier
    pub label: String,
    /// Document text (context windows are cut from it)
    pub text: Arc<str>,
    /// Text plus rendered table rows (patterns search it)
    pub corpus: Arc<str>,
    /// Table rows forwarded to the semantic call
    pub tables: Vec<TableRow>,
    /// Learned profile snapshot taken at request start
    pub profile: Option<LabelProfile>,
    /// Fields to recover, in schema order
    pub fields: Vec<FieldSpec>,
}

/// What the recovery phase produced
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Final candidate per recovered field
    pub candidates: HashMap<String, FieldCandidate>,
    /// Whether the combined semantic call was dispatched
    pub semantic_dispatched: bool,
    /// Outcome of the combined call, if it finished before being aborted
    pub semantic: Option<Arc<BatchOutcome>>,
}

/// Races the recovery strategies for a set of fields
pub struct RecoveryEngine<L> {
    adapter: SemanticAdapter<L>,
    gatekeeper: Gatekeeper,
    context: ContextBuilder,
    context_budget: usize,
    fanout: usize,
    field_timeout: Duration,
}

impl<L> RecoveryEngine<L>
where
    L: SemanticExtractor + 'static,
{
    /// Create an engine
    ///
    /// `context` should use the widened recovery radius.
    pub fn new(
        adapter: SemanticAdapter<L>,
        gatekeeper: Gatekeeper,
        context: ContextBuilder,
        context_budget: usize,
        fanout: usize,
        field_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            gatekeeper,
            context,
            context_budget,
            fanout: fanout.max(1),
            field_timeout,
        }
    }

    /// Recover every field of `input`
    ///
    /// Per-field work runs concurrently, at most `fanout` fields at a time.
    /// One combined semantic call serves all fields; it is aborted once every
    /// field has settled.
    pub async fn recover(&self, input: RecoveryInput) -> RecoveryReport {
        if input.fields.is_empty() {
            return RecoveryReport::default();
        }

        let (tx, rx) = watch::channel::<SharedOutcome>(None);
        let semantic_task = self.dispatch_semantic(&input, tx);

        let semaphore = Arc::new(Semaphore::new(self.fanout));
        let mut tasks = JoinSet::new();
        for field in &input.fields {
            let field = field.clone();
            let example = input
                .profile
                .as_ref()
                .and_then(|p| p.example(&field.name))
                .map(str::to_string);
            let corpus = Arc::clone(&input.corpus);
            let gatekeeper = self.gatekeeper.clone();
            let rx = rx.clone();
            let semaphore = Arc::clone(&semaphore);
            let field_timeout = self.field_timeout;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let name = field.name.clone();
                let raced = tokio::time::timeout(
                    field_timeout,
                    race(field, example, corpus, gatekeeper, rx),
                )
                .await;

                let candidate = match raced {
                    Ok(Some(candidate)) => candidate,
                    Ok(None) => FieldCandidate::unresolved(name.clone(), FieldSource::RecoveryExhausted),
                    Err(_) => FieldCandidate::unresolved(name.clone(), FieldSource::Timeout),
                };
                (name, candidate)
            });
        }
        drop(rx);

        let mut candidates = HashMap::with_capacity(input.fields.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, candidate)) => {
                    debug!(field = %name, source = %candidate.source, "field recovered");
                    candidates.insert(name, candidate);
                }
                Err(e) => debug!(error = %e, "recovery task failed"),
            }
        }

        // A task that died leaves its field exhausted
        for field in &input.fields {
            candidates
                .entry(field.name.clone())
                .or_insert_with(|| FieldCandidate::unresolved(field.name.clone(), FieldSource::RecoveryExhausted));
        }

        semantic_task.abort();
        let semantic = semantic_task.await.ok();

        let recovered = candidates.values().filter(|c| c.value.is_some()).count();
        info!(
            fields = input.fields.len(),
            recovered,
            semantic_finished = semantic.is_some(),
            "recovery finished"
        );

        RecoveryReport {
            candidates,
            semantic_dispatched: true,
            semantic,
        }
    }

    /// Start the one combined semantic call for all recovering fields
    fn dispatch_semantic(
        &self,
        input: &RecoveryInput,
        tx: watch::Sender<SharedOutcome>,
    ) -> tokio::task::JoinHandle<Arc<BatchOutcome>> {
        let hints: Vec<&str> = input
            .fields
            .iter()
            .filter_map(|f| input.profile.as_ref().and_then(|p| p.example(&f.name)))
            .collect();
        let context = self
            .context
            .build(&input.text, &input.fields, &hints, self.context_budget);

        let request = SemanticRequest {
            context,
            label: input.label.clone(),
            fields: hinted_fields(&input.fields, input.profile.as_ref()),
            tables: input.tables.clone(),
        };
        debug!(
            fields = request.fields.len(),
            context_chars = request.context.chars().count(),
            "dispatching combined recovery call"
        );

        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            let outcome = Arc::new(adapter.invoke(&request).await);
            // Nobody listening just means every field already settled
            let _ = tx.send(Some(Arc::clone(&outcome)));
            outcome
        })
    }
}

/// Race the three strategies for one field; `None` when none is accepted
///
/// The two local strategies share one blocking task that tries the relaxed
/// search before the template, so a relaxed hit always beats a template hit.
async fn race(
    field: FieldSpec,
    example: Option<String>,
    corpus: Arc<str>,
    gatekeeper: Gatekeeper,
    rx: watch::Receiver<SharedOutcome>,
) -> Option<FieldCandidate> {
    let mut local = {
        let (field, gatekeeper) = (field.clone(), gatekeeper.clone());
        tokio::task::spawn_blocking(move || {
            relaxed_search(&field, &corpus, &gatekeeper).or_else(|| {
                example.and_then(|example| template_search(&field, &example, &corpus, &gatekeeper))
            })
        })
    };
    let semantic = semantic_answer(&field, rx, &gatekeeper);
    tokio::pin!(semantic);

    let mut local_done = false;
    let mut semantic_done = false;
    loop {
        tokio::select! {
            biased;

            joined = &mut local, if !local_done => {
                local_done = true;
                if let Ok(Some(candidate)) = joined {
                    return Some(candidate);
                }
            }
            answer = &mut semantic, if !semantic_done => {
                semantic_done = true;
                if answer.is_some() {
                    return answer;
                }
            }
            else => return None,
        }
    }
}

/// Wait for the combined call and validate this field's value
async fn semantic_answer(
    field: &FieldSpec,
    mut rx: watch::Receiver<SharedOutcome>,
    gatekeeper: &Gatekeeper,
) -> Option<FieldCandidate> {
    let outcome = {
        let shared = rx.wait_for(Option::is_some).await.ok()?;
        shared.as_ref().map(Arc::clone)?
    };
    let value = outcome.value(&field.name)?;
    accept(field, value, FieldSource::RecoveryLlm, gatekeeper)
}

/// Validate `raw` for `field` and score it
fn accept(
    field: &FieldSpec,
    raw: &str,
    source: FieldSource,
    gatekeeper: &Gatekeeper,
) -> Option<FieldCandidate> {
    match gatekeeper.validate(&field.name, Some(raw), &field.description) {
        Verdict::Accepted(Some(value)) => Some(FieldCandidate {
            confidence: ConfidenceScorer::score(
                &field.name,
                Some(value.as_str()),
                &field.description,
                source,
                true,
            ),
            field: field.name.clone(),
            value: Some(value),
            source,
            validation: ValidationStatus::Accepted,
        }),
        _ => None,
    }
}

/// Look for `<field name>:` (or `-`) and read the value after it
///
/// Name tokens may be separated by spaces, `_` or `-`, and case and accents
/// are ignored. After the anchor the relaxed pattern of each field category
/// is tried; without a category hit the rest of the line is the candidate.
pub fn relaxed_search(field: &FieldSpec, corpus: &str, gatekeeper: &Gatekeeper) -> Option<FieldCandidate> {
    let tokens = tokenize(&field.name);
    if tokens.is_empty() {
        return None;
    }
    let label = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(r"[\s_\-]*");
    let anchor = Regex::new(&format!(r"\b{}\s*[:\-]", label)).ok()?;

    let categories = categories_for(&field.name, &field.description);
    let normalized = NormalizedText::new(corpus);
    for m in anchor.find_iter(normalized.folded()) {
        let after = normalized.to_original(m.range()).end;
        let line = corpus[after..].lines().next().unwrap_or_default();
        let tail: String = line.chars().take(MAX_ANCHOR_TAIL_CHARS).collect();

        for category in &categories {
            if let Some(hit) = category.relaxed().find(&tail) {
                if let Some(candidate) =
                    accept(field, hit.as_str(), FieldSource::RecoveryHeuristic, gatekeeper)
                {
                    return Some(candidate);
                }
            }
        }

        let rest = tail.trim();
        if !rest.is_empty() {
            if let Some(candidate) = accept(field, rest, FieldSource::RecoveryHeuristic, gatekeeper) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Generalize a learned example into a pattern of the same shape
///
/// Digits become `\d`, letters a letter class, whitespace runs `\s+`, and
/// punctuation stays literal. Examples made only of letters and spaces say
/// nothing about shape and yield `None`.
///
/// ```
/// use docsift_extractor::template_pattern;
///
/// assert_eq!(template_pattern("AB-12").unwrap(), r"\b[^\W\d_][^\W\d_]\-\d\d\b");
/// assert!(template_pattern("Ana Souza").is_none());
/// ```
pub fn template_pattern(example: &str) -> Option<String> {
    let example = example.trim();
    if !example
        .chars()
        .any(|c| c.is_ascii_digit() || c.is_ascii_punctuation())
    {
        return None;
    }

    let mut pattern = String::with_capacity(example.len() * 4);
    if example.starts_with(char::is_alphanumeric) {
        pattern.push_str(r"\b");
    }
    let mut in_space = false;
    for ch in example.chars() {
        if ch.is_whitespace() {
            if !in_space {
                pattern.push_str(r"\s+");
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if ch.is_ascii_digit() {
            pattern.push_str(r"\d");
        } else if ch.is_alphabetic() {
            pattern.push_str(r"[^\W\d_]");
        } else {
            pattern.push_str(&regex::escape(&ch.to_string()));
        }
    }
    if example.ends_with(char::is_alphanumeric) {
        pattern.push_str(r"\b");
    }
    Some(pattern)
}

/// Search `corpus` for a value shaped like `example`
pub fn template_search(
    field: &FieldSpec,
    example: &str,
    corpus: &str,
    gatekeeper: &Gatekeeper,
) -> Option<FieldCandidate> {
    let re = Regex::new(&template_pattern(example)?).ok()?;
    let found = re
        .find_iter(corpus)
        .find_map(|m| accept(field, m.as_str(), FieldSource::RecoveryTemplate, gatekeeper));
    found
}
