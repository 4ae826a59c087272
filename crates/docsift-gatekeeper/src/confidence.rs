//! Confidence scoring and escalation policy

use docsift_domain::{Confidence, FieldSource};
use docsift_patterns::{normalize, tokenize};

/// Field-name tokens that mark a field as critical
const CRITICAL_FIELDS: &[&str] = &[
    "cpf",
    "cnpj",
    "email",
    "telefone",
    "celular",
    "data",
    "nascimento",
    "emissao",
    "valor",
    "total",
];

const ESCALATION_THRESHOLD: f64 = 0.72;
const CRITICAL_ESCALATION_THRESHOLD: f64 = 0.85;
const MAX_SCORE: f64 = 0.99;

/// Scores candidates and decides when a cheap answer is not good enough
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    /// Base score of a source before adjustments
    pub fn base(source: FieldSource) -> f64 {
        match source {
            FieldSource::Cache => 0.98,
            FieldSource::Heuristic => 0.65,
            FieldSource::RecoveryHeuristic => 0.68,
            FieldSource::RecoveryTemplate => 0.75,
            FieldSource::Llm => 0.85,
            FieldSource::RecoveryLlm => 0.87,
            FieldSource::Timeout | FieldSource::RecoveryExhausted | FieldSource::Null => 0.0,
        }
    }

    /// Confidence for `value` produced by `source`
    ///
    /// Adjustments: +0.10 when validated, +0.03 for numeric values, −0.02 for
    /// critical fields, −0.05 when the description calls the value
    /// approximate. Capped at 0.99 and rounded to two decimals. Absent or
    /// blank values score zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift_domain::FieldSource;
    /// use docsift_gatekeeper::ConfidenceScorer;
    ///
    /// let c = ConfidenceScorer::score("nome", Some("Ana"), "nome", FieldSource::Llm, true);
    /// assert_eq!(c.value(), 0.95);
    /// let none = ConfidenceScorer::score("nome", None, "nome", FieldSource::Llm, true);
    /// assert_eq!(none.value(), 0.0);
    /// ```
    pub fn score(
        field: &str,
        value: Option<&str>,
        description: &str,
        source: FieldSource,
        validated: bool,
    ) -> Confidence {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return Confidence::ZERO;
        };

        let mut score = Self::base(source);
        if score == 0.0 {
            return Confidence::ZERO;
        }

        if validated {
            score += 0.1;
        }
        if looks_numeric(value) {
            score += 0.03;
        }
        if Self::is_critical(field) {
            score -= 0.02;
        }

        let description = normalize(description);
        if description.contains("aproximad") || description.contains("approximat") {
            score -= 0.05;
        }

        let capped = score.clamp(0.0, MAX_SCORE);
        Confidence::new((capped * 100.0).round() / 100.0)
    }

    /// Whether `field` carries identity, contact, date or money data
    pub fn is_critical(field: &str) -> bool {
        tokenize(field)
            .iter()
            .any(|t| CRITICAL_FIELDS.contains(&t.as_str()))
    }

    /// Threshold below which a candidate for `field` should be escalated
    pub fn escalation_threshold(field: &str) -> f64 {
        if Self::is_critical(field) {
            CRITICAL_ESCALATION_THRESHOLD
        } else {
            ESCALATION_THRESHOLD
        }
    }

    /// Whether a candidate at `confidence` should go to a costlier strategy
    pub fn should_escalate(confidence: Confidence, field: &str) -> bool {
        !confidence.meets(Self::escalation_threshold(field))
    }
}

fn looks_numeric(value: &str) -> bool {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' '))
        .collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_validated_numeric_critical() {
        // 0.85 + 0.10 + 0.03 - 0.02
        let c = ConfidenceScorer::score("valor", Some("1.234,56"), "", FieldSource::Llm, true);
        assert_eq!(c.value(), 0.96);
    }

    #[test]
    fn test_capped_below_one() {
        let c = ConfidenceScorer::score("codigo", Some("12345"), "", FieldSource::Cache, true);
        assert_eq!(c.value(), 0.99);
    }

    #[test]
    fn test_approximate_penalty() {
        let exact = ConfidenceScorer::score("idade", Some("40"), "idade", FieldSource::Llm, false);
        let approx =
            ConfidenceScorer::score("idade", Some("40"), "idade aproximada", FieldSource::Llm, false);
        assert_eq!(exact.value(), 0.88);
        assert_eq!(approx.value(), 0.83);
    }

    #[test]
    fn test_terminal_sources_score_zero() {
        for source in [FieldSource::Timeout, FieldSource::RecoveryExhausted, FieldSource::Null] {
            assert_eq!(ConfidenceScorer::score("x", Some("y"), "", source, true), Confidence::ZERO);
        }
        assert_eq!(
            ConfidenceScorer::score("x", Some("  "), "", FieldSource::Llm, true),
            Confidence::ZERO
        );
    }

    #[test]
    fn test_critical_detection_uses_tokens() {
        assert!(ConfidenceScorer::is_critical("cpf"));
        assert!(ConfidenceScorer::is_critical("data_assinatura"));
        assert!(ConfidenceScorer::is_critical("Valor Total"));
        assert!(!ConfidenceScorer::is_critical("nome"));
        assert!(!ConfidenceScorer::is_critical("database"));
    }

    #[test]
    fn test_should_escalate() {
        assert!(!ConfidenceScorer::should_escalate(Confidence::new(0.95), "cpf"));
        assert!(ConfidenceScorer::should_escalate(Confidence::new(0.80), "cpf"));
        assert!(!ConfidenceScorer::should_escalate(Confidence::new(0.80), "nome"));
        assert!(ConfidenceScorer::should_escalate(Confidence::new(0.60), "numero"));
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("1.234,56"));
        assert!(looks_numeric("123 456"));
        assert!(!looks_numeric("R$ 10"));
        assert!(!looks_numeric(".,"));
    }
}
