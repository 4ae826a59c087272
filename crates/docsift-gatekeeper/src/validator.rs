//! Field value validation logic

use crate::ValidationConfig;
use chrono::NaiveDate;
use docsift_domain::{RejectionReason, ValidationStatus};
use docsift_patterns::{categories_for, enum_options, normalize, Category};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+?55\s*)?\(?\d{2}\)?[\s-]*9?\d{4}[\s-]*\d{4}$").expect("valid regex")
});
static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]{3}[\s-]?\d[a-zA-Z0-9]\d{2}$").expect("valid regex"));
static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:R\$\s*)?-?\d{1,3}(?:[.\s]?\d{3})*(?:[.,]\d{1,2})?$").expect("valid regex")
});

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

const CPF_WEIGHTS_1: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_WEIGHTS_2: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Outcome of validating one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Value passed; carries the normalized value (`None` for absent values)
    Accepted(Option<String>),

    /// Value failed a structural check
    Rejected(RejectionReason),
}

impl Verdict {
    /// Whether the verdict is `Accepted`
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    /// Whether the value was accepted and is present
    pub fn has_value(&self) -> bool {
        matches!(self, Verdict::Accepted(Some(_)))
    }

    /// Validation status to record on a candidate
    pub fn status(&self) -> ValidationStatus {
        match self {
            Verdict::Accepted(_) => ValidationStatus::Accepted,
            Verdict::Rejected(reason) => ValidationStatus::Rejected {
                reason: reason.clone(),
            },
        }
    }

    /// Accepted value, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            Verdict::Accepted(value) => value.as_deref(),
            Verdict::Rejected(_) => None,
        }
    }
}

/// The Gatekeeper validates candidate values before they are accepted
#[derive(Debug, Clone, Default)]
pub struct Gatekeeper {
    config: ValidationConfig,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate `value` for `field`
    ///
    /// Absent values are accepted as absent. Categories come from the field
    /// name, or from format words in the description when the name has none;
    /// the value must fit at least one of them. If the description enumerates allowed values, the value must be
    /// one of them (case and accents ignored).
    pub fn validate(&self, field: &str, value: Option<&str>, description: &str) -> Verdict {
        let Some(raw) = value else {
            return Verdict::Accepted(None);
        };

        let candidate = raw.trim();
        if candidate.is_empty() {
            return Verdict::Rejected(RejectionReason::EmptyValue);
        }

        let mut accepted = candidate.to_string();

        if self.config.validate_formats {
            // A bare digit run has no layout worth enforcing
            let categories: Vec<Category> = categories_for(field, description)
                .into_iter()
                .filter(|c| *c != Category::DocumentNumber)
                .collect();

            if let Some(first) = categories.first() {
                match categories.iter().find_map(|c| self.check(*c, candidate)) {
                    Some(normalized) => accepted = normalized,
                    None => {
                        debug!(field, category = %first, "value rejected: format mismatch");
                        return Verdict::Rejected(RejectionReason::FormatMismatch(
                            first.as_str().to_string(),
                        ));
                    }
                }
            }
        }

        if self.config.validate_enums {
            if let Some(options) = enum_options(description) {
                let folded = normalize(&accepted);
                if !options.iter().any(|o| *o == folded) {
                    debug!(field, "value rejected: not among enumerated options");
                    return Verdict::Rejected(RejectionReason::OutOfEnum);
                }
            }
        }

        Verdict::Accepted(Some(accepted))
    }

    /// Check `value` against one category; `Some(normalized)` when it fits
    fn check(&self, category: Category, value: &str) -> Option<String> {
        match category {
            Category::Cpf => self.check_tax_id(value, 11),
            Category::Cnpj => self.check_tax_id(value, 14),
            Category::Email => EMAIL_RE.is_match(value).then(|| value.to_string()),
            Category::Phone => PHONE_RE.is_match(value).then(|| value.to_string()),
            Category::Date => DATE_FORMATS
                .iter()
                .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
                .then(|| value.to_string()),
            Category::Cep => {
                let digits = digits_if_only_separators(value)?;
                if digits.len() != 8 {
                    return None;
                }
                Some(if self.config.normalize_values {
                    format!("{}-{}", &digits[..5], &digits[5..])
                } else {
                    value.to_string()
                })
            }
            Category::Plate => PLATE_RE.is_match(value).then(|| {
                if self.config.normalize_values {
                    value.to_uppercase()
                } else {
                    value.to_string()
                }
            }),
            Category::Currency => CURRENCY_RE.is_match(value).then(|| value.to_string()),
            Category::DocumentNumber => Some(value.to_string()),
        }
    }

    /// CPF (11 digits) or CNPJ (14 digits)
    fn check_tax_id(&self, value: &str, len: usize) -> Option<String> {
        let digits = digits_if_only_separators(value)?;
        if digits.len() != len {
            return None;
        }

        // 000.000.000-00 and friends pass the checksum but are placeholders
        let first = digits.as_bytes()[0];
        if digits.bytes().all(|b| b == first) {
            return None;
        }

        if self.config.verify_checksums {
            let ok = if len == 11 {
                cpf_checksum_ok(&digits)
            } else {
                cnpj_checksum_ok(&digits)
            };
            if !ok {
                return None;
            }
        }

        if !self.config.normalize_values {
            return Some(value.to_string());
        }

        Some(if len == 11 {
            format!(
                "{}.{}.{}-{}",
                &digits[..3],
                &digits[3..6],
                &digits[6..9],
                &digits[9..]
            )
        } else {
            format!(
                "{}.{}.{}/{}-{}",
                &digits[..2],
                &digits[2..5],
                &digits[5..8],
                &digits[8..12],
                &digits[12..]
            )
        })
    }
}

/// Digits of `value` when everything else is `.`, `-`, `/` or a space
fn digits_if_only_separators(value: &str) -> Option<String> {
    if value
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' ')))
    {
        return None;
    }
    Some(value.chars().filter(char::is_ascii_digit).collect())
}

fn digit_values(digits: &str) -> Vec<u32> {
    digits.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn cpf_checksum_ok(digits: &str) -> bool {
    let d = digit_values(digits);
    let check = |weights: &[u32]| {
        let sum: u32 = weights.iter().zip(&d).map(|(w, v)| w * v).sum();
        let r = (sum * 10) % 11;
        if r == 10 {
            0
        } else {
            r
        }
    };
    check(&CPF_WEIGHTS_1) == d[9] && check(&CPF_WEIGHTS_2) == d[10]
}

fn cnpj_checksum_ok(digits: &str) -> bool {
    let d = digit_values(digits);
    let check = |weights: &[u32]| {
        let sum: u32 = weights.iter().zip(&d).map(|(w, v)| w * v).sum();
        let r = sum % 11;
        if r < 2 {
            0
        } else {
            11 - r
        }
    };
    check(&CNPJ_WEIGHTS_1) == d[12] && check(&CNPJ_WEIGHTS_2) == d[13]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gatekeeper() -> Gatekeeper {
        Gatekeeper::default_config()
    }

    fn accepted(value: &str) -> Verdict {
        Verdict::Accepted(Some(value.to_string()))
    }

    #[test]
    fn test_absent_value_accepted() {
        assert_eq!(gatekeeper().validate("cpf", None, "documento CPF"), Verdict::Accepted(None));
    }

    #[test]
    fn test_blank_value_rejected() {
        assert_eq!(
            gatekeeper().validate("nome", Some("   "), "nome"),
            Verdict::Rejected(RejectionReason::EmptyValue)
        );
    }

    #[test]
    fn test_cpf_layout_only_by_default() {
        let gk = gatekeeper();
        assert_eq!(gk.validate("cpf", Some("123.456.789-00"), ""), accepted("123.456.789-00"));
        assert_eq!(gk.validate("cpf", Some(" 12345678900 "), ""), accepted("123.456.789-00"));
        assert_eq!(
            gk.validate("cpf", Some("111.111.111-11"), ""),
            Verdict::Rejected(RejectionReason::FormatMismatch("cpf".to_string()))
        );
        assert!(!gk.validate("cpf", Some("1234"), "").is_accepted());
        assert!(!gk.validate("cpf", Some("abc.def.ghi-jk"), "").is_accepted());
    }

    #[test]
    fn test_cpf_checksum_when_strict() {
        let gk = Gatekeeper::new(ValidationConfig::strict());
        assert!(gk.validate("cpf", Some("529.982.247-25"), "").is_accepted());
        assert!(gk.validate("cpf", Some("123.456.789-09"), "").is_accepted());
        assert!(!gk.validate("cpf", Some("123.456.789-00"), "").is_accepted());
    }

    #[test]
    fn test_cnpj() {
        let strict = Gatekeeper::new(ValidationConfig::strict());
        assert_eq!(
            strict.validate("cnpj", Some("11222333000181"), ""),
            accepted("11.222.333/0001-81")
        );
        assert!(!strict.validate("cnpj", Some("11.222.333/0001-82"), "").is_accepted());
        assert!(gatekeeper().validate("cnpj", Some("11.222.333/0001-82"), "").is_accepted());
    }

    #[test]
    fn test_email_and_phone() {
        let gk = gatekeeper();
        assert!(gk.validate("email", Some("ana@example.com"), "").is_accepted());
        assert!(!gk.validate("email", Some("ana at example"), "").is_accepted());
        assert!(gk.validate("telefone", Some("(11) 91234-5678"), "").is_accepted());
        assert!(gk.validate("contato", Some("+55 11 3456-7890"), "telefone fixo").is_accepted());
        assert!(!gk.validate("celular", Some("12-34"), "").is_accepted());
    }

    #[test]
    fn test_dates_are_calendar_checked() {
        let gk = gatekeeper();
        assert!(gk.validate("data_assinatura", Some("15/03/2024"), "data de assinatura").is_accepted());
        assert!(gk.validate("nascimento", Some("1990-07-01"), "").is_accepted());
        assert!(gk.validate("emissao", Some("01.02.2020"), "").is_accepted());
        assert!(!gk.validate("data", Some("31/02/2024"), "").is_accepted());
        assert!(!gk.validate("data", Some("ontem"), "").is_accepted());
    }

    #[test]
    fn test_cep_and_plate_normalized() {
        let gk = gatekeeper();
        assert_eq!(gk.validate("cep", Some("01310100"), ""), accepted("01310-100"));
        assert_eq!(gk.validate("placa", Some("abc-1234"), ""), accepted("ABC-1234"));
        assert!(!gk.validate("cep", Some("0131"), "").is_accepted());
    }

    #[test]
    fn test_currency() {
        let gk = gatekeeper();
        assert!(gk.validate("valor", Some("R$ 1.234,56"), "").is_accepted());
        assert!(gk.validate("total", Some("1234.50"), "").is_accepted());
        assert!(!gk.validate("valor", Some("mil reais"), "").is_accepted());
    }

    #[test]
    fn test_enum_membership() {
        let gk = gatekeeper();
        let desc = "tipo de pessoa, pode ser PF, PJ ou MEI";
        assert_eq!(gk.validate("tipo", Some("PJ"), desc), accepted("PJ"));
        assert_eq!(
            gk.validate("tipo", Some("ONG"), desc),
            Verdict::Rejected(RejectionReason::OutOfEnum)
        );
        assert!(gk.validate("situacao", Some("Inválido"), "one of valido, invalido").is_accepted());
    }

    #[test]
    fn test_free_text_accepted_trimmed() {
        assert_eq!(
            gatekeeper().validate("nome", Some("  Ana Souza "), "nome completo conforme documento"),
            accepted("Ana Souza")
        );
    }

    #[test]
    fn test_loose_description_words_do_not_impose_formats() {
        let gk = gatekeeper();
        assert_eq!(
            gk.validate("nome", Some("Ana Souza"), "nome do titular conforme cadastro"),
            accepted("Ana Souza")
        );
        assert_eq!(
            gk.validate("descricao", Some("Consultoria tributaria"), "descrição do serviço, sem o valor"),
            accepted("Consultoria tributaria")
        );
        // A format word in the description still counts
        assert!(!gk.validate("contato", Some("Ana"), "e-mail do titular").is_accepted());
    }

    #[test]
    fn test_permissive_skips_formats() {
        let gk = Gatekeeper::new(ValidationConfig::permissive());
        assert_eq!(gk.validate("cpf", Some("n/a"), ""), accepted("n/a"));
    }

    #[test]
    fn test_verdict_status() {
        let rejected = Verdict::Rejected(RejectionReason::OutOfEnum);
        assert_eq!(
            rejected.status(),
            ValidationStatus::Rejected {
                reason: RejectionReason::OutOfEnum
            }
        );
        assert_eq!(rejected.value(), None);
        assert!(accepted("x").has_value());
        assert!(!Verdict::Accepted(None).has_value());
    }

    proptest! {
        #[test]
        fn formatted_cpf_digits_always_accepted(digits in "[0-9]{11}") {
            prop_assume!(digits.bytes().any(|b| b != digits.as_bytes()[0]));
            let verdict = gatekeeper().validate("cpf", Some(&digits), "");
            let expected = format!(
                "{}.{}.{}-{}",
                &digits[..3], &digits[3..6], &digits[6..9], &digits[9..]
            );
            prop_assert_eq!(verdict, Verdict::Accepted(Some(expected)));
        }
    }
}
