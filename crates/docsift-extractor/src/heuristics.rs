//! Strict pattern pass over the document
//!
//! Runs before any semantic call. A field is only resolved here when the
//! document offers exactly one plausible value for it.

use docsift_domain::{Confidence, FieldSpec, TableRow};
use docsift_patterns::{categories_for, enum_options, Category, NormalizedText};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

/// Confidence of a single enumerated option found in the text
const ENUM_MATCH_CONFIDENCE: f64 = 0.99;

/// What the heuristic pass concluded for one field
#[derive(Debug, Clone, PartialEq)]
pub enum HeuristicOutcome {
    /// Exactly one distinct value
    Matched {
        /// Value as written in the document
        value: String,
        /// How far a lone match can be trusted
        confidence: Confidence,
        /// Category that matched; `None` for enumerated options
        category: Option<Category>,
    },

    /// Several distinct values; the pass cannot choose
    Ambiguous {
        /// Distinct values in document order
        candidates: Vec<String>,
    },

    /// No plausible value
    NotFound,
}

impl HeuristicOutcome {
    /// Whether the outcome carries a single value
    pub fn is_matched(&self) -> bool {
        matches!(self, HeuristicOutcome::Matched { .. })
    }
}

/// Text searched by the heuristic and recovery passes
///
/// Table rows follow the document text, one row per line with cells
/// joined by ` | `.
pub fn corpus<'a>(text: &'a str, tables: &[TableRow]) -> Cow<'a, str> {
    if tables.is_empty() {
        return Cow::Borrowed(text);
    }

    let mut corpus = String::with_capacity(text.len() + tables.len() * 32);
    corpus.push_str(text);
    for row in tables {
        corpus.push('\n');
        corpus.push_str(&row.join(" | "));
    }
    Cow::Owned(corpus)
}

/// Resolve `field` against `corpus`
///
/// Descriptions that enumerate allowed values are matched option by option
/// (whole words, case and accents ignored). Otherwise the field's categories
/// come from the keyword table and each category's strict pattern is run.
///
/// # Examples
///
/// ```
/// use docsift_domain::FieldSpec;
/// use docsift_extractor::{resolve, HeuristicOutcome};
///
/// let field = FieldSpec::new("cpf", "documento CPF");
/// let outcome = resolve(&field, "CPF: 123.456.789-00");
/// assert!(matches!(outcome, HeuristicOutcome::Matched { ref value, .. } if value == "123.456.789-00"));
/// ```
pub fn resolve(field: &FieldSpec, corpus: &str) -> HeuristicOutcome {
    if let Some(options) = enum_options(&field.description) {
        return resolve_enum(&options, corpus);
    }

    let categories = categories_for(&field.name, &field.description);
    if categories.is_empty() {
        return HeuristicOutcome::NotFound;
    }
    resolve_categories(&categories, corpus)
}

fn resolve_enum(options: &[String], corpus: &str) -> HeuristicOutcome {
    let normalized = NormalizedText::new(corpus);

    // (first position, value as written) per option found
    let mut hits: Vec<(usize, String)> = Vec::new();
    for option in options {
        let pattern = format!(r"\b{}\b", regex::escape(option));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(m) = re.find(normalized.folded()) {
            hits.push((m.start(), normalized.original_slice(m.range()).to_string()));
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);

    match hits.len() {
        0 => HeuristicOutcome::NotFound,
        1 => {
            let (_, value) = hits.remove(0);
            HeuristicOutcome::Matched {
                value,
                confidence: Confidence::new(ENUM_MATCH_CONFIDENCE),
                category: None,
            }
        }
        _ => HeuristicOutcome::Ambiguous {
            candidates: hits.into_iter().map(|(_, v)| v).collect(),
        },
    }
}

struct Hit<'a> {
    span: Range<usize>,
    value: &'a str,
    category: Category,
}

fn resolve_categories(categories: &[Category], corpus: &str) -> HeuristicOutcome {
    let hits: Vec<Hit<'_>> = categories
        .iter()
        .flat_map(|category| {
            category.strict().find_iter(corpus).map(move |m| Hit {
                span: m.range(),
                value: m.as_str(),
                category: *category,
            })
        })
        .collect();

    // A match inside a longer match of another category is part of that value
    let mut kept: Vec<&Hit<'_>> = hits
        .iter()
        .filter(|hit| {
            !hits.iter().any(|other| {
                other.category != hit.category
                    && other.span.len() > hit.span.len()
                    && other.span.start <= hit.span.start
                    && hit.span.end <= other.span.end
            })
        })
        .collect();
    kept.sort_by_key(|hit| hit.span.start);

    let mut distinct: Vec<&Hit<'_>> = Vec::new();
    for hit in kept {
        if !distinct.iter().any(|d| d.value == hit.value) {
            distinct.push(hit);
        }
    }

    match distinct.as_slice() {
        [] => HeuristicOutcome::NotFound,
        [only] => HeuristicOutcome::Matched {
            value: only.value.to_string(),
            confidence: Confidence::new(only.category.specificity()),
            category: Some(only.category),
        },
        many => HeuristicOutcome::Ambiguous {
            candidates: many.iter().map(|hit| hit.value.to_string()).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, description: &str) -> FieldSpec {
        FieldSpec::new(name, description)
    }

    #[test]
    fn test_single_cpf_matches() {
        let outcome = resolve(&field("cpf", "documento CPF"), "Nome: Ana\nCPF: 123.456.789-00\n");
        match outcome {
            HeuristicOutcome::Matched {
                value,
                confidence,
                category,
            } => {
                assert_eq!(value, "123.456.789-00");
                assert_eq!(confidence.value(), 0.95);
                assert_eq!(category, Some(Category::Cpf));
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_other_id_numbers_do_not_compete_with_cpf() {
        let outcome = resolve(
            &field("cpf", "documento CPF"),
            "RG: 12345678\nCPF: 123.456.789-00\nMatrícula 998877",
        );
        assert!(matches!(
            outcome,
            HeuristicOutcome::Matched { ref value, category: Some(Category::Cpf), .. }
                if value == "123.456.789-00"
        ));
    }

    #[test]
    fn test_two_dates_are_ambiguous() {
        let outcome = resolve(
            &field("data_assinatura", "data de assinatura"),
            "Assinado em 01/02/2024, vigente até 15/03/2025.",
        );
        assert_eq!(
            outcome,
            HeuristicOutcome::Ambiguous {
                candidates: vec!["01/02/2024".to_string(), "15/03/2025".to_string()]
            }
        );
    }

    #[test]
    fn test_repeated_value_counts_once() {
        let outcome = resolve(
            &field("email", "e-mail de contato"),
            "Contato: ana@example.com (ou ana@example.com)",
        );
        assert!(outcome.is_matched());
    }

    #[test]
    fn test_contained_match_of_other_category_dropped() {
        // The digit run inside the phone number must not compete with it
        let outcome = resolve(
            &field("telefone", "numero de telefone"),
            "Tel: 11 912345678",
        );
        assert!(matches!(
            outcome,
            HeuristicOutcome::Matched { category: Some(Category::Phone), .. }
        ));
    }

    #[test]
    fn test_no_category_is_not_found() {
        assert_eq!(
            resolve(&field("nome", "nome completo"), "Nome: Ana Souza"),
            HeuristicOutcome::NotFound
        );
    }

    #[test]
    fn test_absent_value_is_not_found() {
        assert_eq!(
            resolve(&field("email", "e-mail"), "sem contato eletrônico"),
            HeuristicOutcome::NotFound
        );
    }

    #[test]
    fn test_enum_single_option() {
        let outcome = resolve(
            &field("tipo_pessoa", "Tipo de pessoa, pode ser PF, PJ ou MEI"),
            "Cadastro de Pessoa Jurídica. Tipo: PJ",
        );
        match outcome {
            HeuristicOutcome::Matched {
                value,
                confidence,
                category,
            } => {
                assert_eq!(value, "PJ");
                assert_eq!(confidence.value(), 0.99);
                assert_eq!(category, None);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_respects_word_boundaries_and_accents() {
        let spec = field("turno", "pode ser manhã ou tarde");
        assert!(matches!(
            resolve(&spec, "Turno: MANHA"),
            HeuristicOutcome::Matched { ref value, .. } if value == "MANHA"
        ));
        // "tarde" inside "atardecer" is not a hit
        assert_eq!(resolve(&spec, "atardecer"), HeuristicOutcome::NotFound);
    }

    #[test]
    fn test_enum_several_options_ambiguous() {
        let outcome = resolve(&field("cor", "one of: red, green, blue"), "green and red");
        assert_eq!(
            outcome,
            HeuristicOutcome::Ambiguous {
                candidates: vec!["green".to_string(), "red".to_string()]
            }
        );
    }

    #[test]
    fn test_corpus_appends_table_rows() {
        let tables = vec![
            vec!["Item".to_string(), "Valor".to_string()],
            vec!["Taxa".to_string(), "R$ 10,00".to_string()],
        ];
        let corpus = corpus("Fatura", &tables);
        assert_eq!(corpus, "Fatura\nItem | Valor\nTaxa | R$ 10,00");
        assert!(matches!(super::corpus("x", &[]), Cow::Borrowed("x")));
    }

    #[test]
    fn test_table_value_found() {
        let tables = vec![vec!["Total".to_string(), "R$ 1.234,56".to_string()]];
        let text = corpus("Fatura de serviços", &tables);
        assert!(matches!(
            resolve(&field("valor_total", "valor total"), &text),
            HeuristicOutcome::Matched { ref value, .. } if value == "R$ 1.234,56"
        ));
    }
}
