//! Field candidates: a value, where it came from, how far to trust it

use crate::Confidence;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What produced a field's final value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSource {
    /// Replayed from the result cache
    Cache,

    /// Strict pattern match during the heuristic pass
    Heuristic,

    /// Batched semantic extraction call
    Llm,

    /// Relaxed, field-name anchored pattern search during recovery
    RecoveryHeuristic,

    /// Shape match against a learned example during recovery
    RecoveryTemplate,

    /// Combined contextual semantic call during recovery
    RecoveryLlm,

    /// Recovery hit its wall-clock cap
    Timeout,

    /// Every recovery strategy finished without an accepted value
    RecoveryExhausted,

    /// Nothing in the document for this field
    Null,
}

impl FieldSource {
    /// Stable tag used in output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSource::Cache => "cache",
            FieldSource::Heuristic => "heuristic",
            FieldSource::Llm => "llm",
            FieldSource::RecoveryHeuristic => "recovery-heuristic",
            FieldSource::RecoveryTemplate => "recovery-template",
            FieldSource::RecoveryLlm => "recovery-llm",
            FieldSource::Timeout => "timeout",
            FieldSource::RecoveryExhausted => "recovery-exhausted",
            FieldSource::Null => "null",
        }
    }

    /// Parse a source tag
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cache" => Some(FieldSource::Cache),
            "heuristic" => Some(FieldSource::Heuristic),
            "llm" => Some(FieldSource::Llm),
            "recovery-heuristic" => Some(FieldSource::RecoveryHeuristic),
            "recovery-template" => Some(FieldSource::RecoveryTemplate),
            "recovery-llm" => Some(FieldSource::RecoveryLlm),
            "timeout" => Some(FieldSource::Timeout),
            "recovery-exhausted" => Some(FieldSource::RecoveryExhausted),
            "null" => Some(FieldSource::Null),
            _ => None,
        }
    }

    /// Whether this source came out of the recovery phase
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            FieldSource::RecoveryHeuristic
                | FieldSource::RecoveryTemplate
                | FieldSource::RecoveryLlm
                | FieldSource::Timeout
                | FieldSource::RecoveryExhausted
        )
    }
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the validator refused a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum RejectionReason {
    /// Value is blank after trimming
    EmptyValue,

    /// Value does not fit the format of the named category
    FormatMismatch(String),

    /// Value is not one of the values enumerated in the description
    OutOfEnum,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::EmptyValue => write!(f, "empty value"),
            RejectionReason::FormatMismatch(category) => {
                write!(f, "does not match {} format", category)
            }
            RejectionReason::OutOfEnum => write!(f, "not one of the allowed values"),
        }
    }
}

/// Outcome of structural validation for a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ValidationStatus {
    /// Passed (absent values are always accepted)
    Accepted,

    /// Failed with a reason
    Rejected {
        /// Why it failed
        reason: RejectionReason,
    },

    /// No validation ran (the field timed out before any candidate)
    NotChecked,
}

impl ValidationStatus {
    /// Whether the status is `Accepted`
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationStatus::Accepted)
    }
}

/// A proposed value for one field with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    /// Field name
    pub field: String,

    /// Value, `None` when the field resolved to null
    pub value: Option<String>,

    /// What produced the value
    pub source: FieldSource,

    /// Structural confidence
    pub confidence: Confidence,

    /// Validation outcome
    pub validation: ValidationStatus,
}

impl FieldCandidate {
    /// An accepted, non-null candidate
    pub fn accepted(
        field: impl Into<String>,
        value: impl Into<String>,
        source: FieldSource,
        confidence: Confidence,
    ) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            source,
            confidence,
            validation: ValidationStatus::Accepted,
        }
    }

    /// A null candidate; absence is a valid outcome, not a failure
    pub fn null(field: impl Into<String>, source: FieldSource) -> Self {
        Self {
            field: field.into(),
            value: None,
            source,
            confidence: Confidence::ZERO,
            validation: ValidationStatus::Accepted,
        }
    }

    /// A null candidate for a field no strategy could settle
    ///
    /// Nothing was accepted, so the validation status is `NotChecked`.
    pub fn unresolved(field: impl Into<String>, source: FieldSource) -> Self {
        Self {
            validation: ValidationStatus::NotChecked,
            ..Self::null(field, source)
        }
    }

    /// Whether there is a non-blank value that passed validation
    pub fn has_accepted_value(&self) -> bool {
        self.validation.is_accepted()
            && self.value.as_deref().map_or(false, |v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip_tags() {
        for source in [
            FieldSource::Cache,
            FieldSource::Heuristic,
            FieldSource::Llm,
            FieldSource::RecoveryHeuristic,
            FieldSource::RecoveryTemplate,
            FieldSource::RecoveryLlm,
            FieldSource::Timeout,
            FieldSource::RecoveryExhausted,
            FieldSource::Null,
        ] {
            assert_eq!(FieldSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(FieldSource::parse("bogus"), None);
    }

    #[test]
    fn test_source_serializes_kebab_case() {
        let json = serde_json::to_string(&FieldSource::RecoveryTemplate).unwrap();
        assert_eq!(json, "\"recovery-template\"");
    }

    #[test]
    fn test_null_candidate() {
        let candidate = FieldCandidate::null("cpf", FieldSource::Null);
        assert_eq!(candidate.value, None);
        assert_eq!(candidate.confidence, Confidence::ZERO);
        assert!(candidate.validation.is_accepted());
        assert!(!candidate.has_accepted_value());
    }

    #[test]
    fn test_unresolved_candidate_is_not_checked() {
        let candidate = FieldCandidate::unresolved("cpf", FieldSource::RecoveryExhausted);
        assert_eq!(candidate.value, None);
        assert_eq!(candidate.confidence, Confidence::ZERO);
        assert_eq!(candidate.validation, ValidationStatus::NotChecked);
        assert!(!candidate.has_accepted_value());
    }

    #[test]
    fn test_rejected_has_no_accepted_value() {
        let candidate = FieldCandidate {
            field: "email".to_string(),
            value: Some("nope".to_string()),
            source: FieldSource::Llm,
            confidence: Confidence::new(0.4),
            validation: ValidationStatus::Rejected {
                reason: RejectionReason::FormatMismatch("email".to_string()),
            },
        };
        assert!(!candidate.has_accepted_value());
    }
}
