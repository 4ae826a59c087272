//! Schema learner: bounded per-label memory of past resolutions
//!
//! Learned data is advisory. It seeds templates and context keywords but a
//! value derived from it still has to pass validation like any other.

use crate::StoreError;
use docsift_domain::{FieldCandidate, FieldSource, Schema};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// What was learned about one field of one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedField {
    /// Source that produced the last accepted value
    pub last_source: FieldSource,

    /// Last accepted value, truncated to the learner's example cap
    pub example: String,

    /// Field description at the time it was learned
    pub description: String,
}

/// Everything learned about one label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelProfile {
    fields: BTreeMap<String, LearnedField>,
}

impl LabelProfile {
    /// Learned data for `field`
    pub fn get(&self, field: &str) -> Option<&LearnedField> {
        self.fields.get(field)
    }

    /// Learned example for `field`
    pub fn example(&self, field: &str) -> Option<&str> {
        self.get(field).map(|f| f.example.as_str())
    }

    /// Number of learned fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing was learned
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Learned fields by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LearnedField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }
}

/// Bounded store of [`LabelProfile`]s
///
/// Holds at most `max_labels` profiles and evicts the least recently
/// *updated* one; lookups do not count as use. Examples are cut to
/// `max_example_len` chars before they are stored, and a label stops
/// accepting new fields once it tracks `max_fields_per_label` (known fields
/// keep updating).
pub struct SchemaLearner {
    profiles: Mutex<LruCache<String, LabelProfile>>,
    max_example_len: usize,
    max_fields_per_label: usize,
}

impl SchemaLearner {
    /// Create a learner with the given bounds
    ///
    /// # Errors
    /// Returns error if any bound is zero
    pub fn new(
        max_labels: usize,
        max_example_len: usize,
        max_fields_per_label: usize,
    ) -> Result<Self, StoreError> {
        let max_labels =
            NonZeroUsize::new(max_labels).ok_or(StoreError::InvalidCapacity("max_labels"))?;
        if max_example_len == 0 {
            return Err(StoreError::InvalidCapacity("max_example_len"));
        }
        if max_fields_per_label == 0 {
            return Err(StoreError::InvalidCapacity("max_fields_per_label"));
        }

        Ok(Self {
            profiles: Mutex::new(LruCache::new(max_labels)),
            max_example_len,
            max_fields_per_label,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, LabelProfile>>, StoreError> {
        self.profiles.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Record every accepted, non-empty value of `candidates` under `label`
    ///
    /// Returns the number of fields written. A label with nothing to learn
    /// is left untouched (it neither gains a profile nor refreshes recency).
    ///
    /// # Errors
    /// Returns error if the lock is poisoned
    pub fn learn(
        &self,
        label: &str,
        schema: &Schema,
        candidates: &[FieldCandidate],
    ) -> Result<usize, StoreError> {
        let learnable: Vec<(&FieldCandidate, &str)> = candidates
            .iter()
            .filter(|c| c.has_accepted_value())
            .filter_map(|c| c.value.as_deref().map(|v| (c, v)))
            .collect();
        if learnable.is_empty() {
            return Ok(0);
        }

        let mut profiles = self.lock()?;
        let mut profile = profiles.pop(label).unwrap_or_default();

        let mut written = 0;
        for (candidate, value) in learnable {
            let known = profile.fields.contains_key(&candidate.field);
            if !known && profile.fields.len() >= self.max_fields_per_label {
                debug!(label, field = %candidate.field, "field cap reached, not learning");
                continue;
            }

            let entry = LearnedField {
                last_source: candidate.source,
                example: value.chars().take(self.max_example_len).collect(),
                description: schema
                    .description(&candidate.field)
                    .unwrap_or_default()
                    .to_string(),
            };
            profile.fields.insert(candidate.field.clone(), entry);
            written += 1;
        }

        if let Some((evicted, _)) = profiles.push(label.to_string(), profile) {
            debug!(label = %evicted, "label profile evicted");
        }
        Ok(written)
    }

    /// Advisory data for (`label`, `field`)
    pub fn suggest(&self, label: &str, field: &str) -> Option<LearnedField> {
        self.with_profile(label, |p| p.get(field).cloned()).flatten()
    }

    /// Source that last resolved (`label`, `field`)
    pub fn suggest_source(&self, label: &str, field: &str) -> Option<FieldSource> {
        self.suggest(label, field).map(|f| f.last_source)
    }

    /// Immutable copy of a label's profile, taken once per request
    pub fn snapshot(&self, label: &str) -> Option<LabelProfile> {
        self.with_profile(label, LabelProfile::clone)
    }

    fn with_profile<T>(&self, label: &str, f: impl FnOnce(&LabelProfile) -> T) -> Option<T> {
        match self.lock() {
            Ok(profiles) => profiles.peek(label).map(f),
            Err(e) => {
                warn!(error = %e, "learner unavailable");
                None
            }
        }
    }

    /// Number of tracked labels
    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Whether no label is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked labels, most recently updated first
    pub fn labels(&self) -> Vec<String> {
        self.lock()
            .map(|p| p.iter().map(|(label, _)| label.clone()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for SchemaLearner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaLearner")
            .field("labels", &self.len())
            .field("max_example_len", &self.max_example_len)
            .field("max_fields_per_label", &self.max_fields_per_label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_domain::{Confidence, RejectionReason, ValidationStatus};

    fn schema() -> Schema {
        Schema::from_pairs([("cpf", "documento CPF"), ("nome", "nome completo")]).unwrap()
    }

    fn hit(field: &str, value: &str, source: FieldSource) -> FieldCandidate {
        FieldCandidate::accepted(field, value, source, Confidence::new(0.9))
    }

    #[test]
    fn test_learns_accepted_values() {
        let learner = SchemaLearner::new(10, 64, 50).unwrap();
        let written = learner
            .learn(
                "id-card",
                &schema(),
                &[
                    hit("cpf", "123.456.789-00", FieldSource::Heuristic),
                    FieldCandidate::null("nome", FieldSource::Null),
                ],
            )
            .unwrap();

        assert_eq!(written, 1);
        let learned = learner.suggest("id-card", "cpf").unwrap();
        assert_eq!(learned.example, "123.456.789-00");
        assert_eq!(learned.last_source, FieldSource::Heuristic);
        assert_eq!(learned.description, "documento CPF");
        assert!(learner.suggest("id-card", "nome").is_none());
        assert_eq!(learner.suggest_source("id-card", "cpf"), Some(FieldSource::Heuristic));
    }

    #[test]
    fn test_rejected_values_not_learned() {
        let learner = SchemaLearner::new(10, 64, 50).unwrap();
        let rejected = FieldCandidate {
            validation: ValidationStatus::Rejected {
                reason: RejectionReason::OutOfEnum,
            },
            ..hit("nome", "xyz", FieldSource::Llm)
        };
        assert_eq!(learner.learn("l", &schema(), &[rejected]).unwrap(), 0);
        assert!(learner.is_empty());
    }

    #[test]
    fn test_example_truncated_before_storage() {
        let learner = SchemaLearner::new(10, 5, 50).unwrap();
        learner
            .learn("l", &schema(), &[hit("nome", "Ánderson Silva", FieldSource::Llm)])
            .unwrap();
        assert_eq!(learner.suggest("l", "nome").unwrap().example, "Ánder");
    }

    #[test]
    fn test_field_cap_keeps_known_fields_updating() {
        let learner = SchemaLearner::new(10, 64, 1).unwrap();
        learner
            .learn("l", &schema(), &[hit("cpf", "111", FieldSource::Llm)])
            .unwrap();
        let written = learner
            .learn(
                "l",
                &schema(),
                &[
                    hit("cpf", "222", FieldSource::Heuristic),
                    hit("nome", "Ana", FieldSource::Llm),
                ],
            )
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(learner.suggest("l", "cpf").unwrap().example, "222");
        assert!(learner.suggest("l", "nome").is_none());
    }

    #[test]
    fn test_reads_do_not_refresh_recency() {
        let learner = SchemaLearner::new(2, 64, 50).unwrap();
        learner.learn("a", &schema(), &[hit("cpf", "1", FieldSource::Llm)]).unwrap();
        learner.learn("b", &schema(), &[hit("cpf", "2", FieldSource::Llm)]).unwrap();

        assert!(learner.snapshot("a").is_some());
        learner.learn("c", &schema(), &[hit("cpf", "3", FieldSource::Llm)]).unwrap();

        assert_eq!(learner.labels(), vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let learner = SchemaLearner::new(2, 64, 50).unwrap();
        learner.learn("a", &schema(), &[hit("cpf", "1", FieldSource::Llm)]).unwrap();
        let snapshot = learner.snapshot("a").unwrap();
        learner.learn("a", &schema(), &[hit("cpf", "2", FieldSource::Llm)]).unwrap();

        assert_eq!(snapshot.example("cpf"), Some("1"));
        assert_eq!(learner.snapshot("a").unwrap().example("cpf"), Some("2"));
    }

    #[test]
    fn test_zero_bounds_rejected() {
        assert!(SchemaLearner::new(0, 64, 50).is_err());
        assert!(SchemaLearner::new(1, 0, 50).is_err());
        assert!(SchemaLearner::new(1, 64, 0).is_err());
    }
}
