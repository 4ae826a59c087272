//! Pattern categories and their compiled regexes

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// A family of value formats with its own patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Brazilian individual taxpayer id (`000.000.000-00`)
    Cpf,
    /// Brazilian company taxpayer id (`00.000.000/0000-00`)
    Cnpj,
    /// Email address
    Email,
    /// Phone number, optional +55 and area code
    Phone,
    /// Calendar date
    Date,
    /// Brazilian postal code (`00000-000`)
    Cep,
    /// Vehicle plate, old and Mercosul layouts
    Plate,
    /// Monetary amount in `R$ 1.234,56` notation
    Currency,
    /// Generic run of digits
    DocumentNumber,
}

static CPF_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b").expect("valid regex"));
static CNPJ_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}\b").expect("valid regex"));
static EMAIL_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid regex")
});
static PHONE_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?55\s*)?(?:\(\d{2}\)|\b\d{2})[\s-]*9?\d{4}[\s-]*\d{4}\b")
        .expect("valid regex")
});
static DATE_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}[/.-]\d{1,2}[/.-]\d{4}|\d{4}-\d{2}-\d{2})\b").expect("valid regex")
});
static CEP_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{5}-\d{3}\b").expect("valid regex"));
static PLATE_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z]{3}-?\d[a-z0-9]\d{2}\b").expect("valid regex"));
static CURRENCY_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"R\$\s*\d{1,3}(?:\.\d{3})*,\d{2}\b").expect("valid regex"));
static NUMBER_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{6,12}\b").expect("valid regex"));

static CPF_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{3}[.\s]?\d{3}[.\s]?\d{3}[-\s]?\d{2}\b").expect("valid regex")
});
static CNPJ_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b").expect("valid regex")
});
static EMAIL_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("valid regex")
});
static PHONE_RELAXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{7,16}\d").expect("valid regex"));
static DATE_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}\s*[/.-]\s*\d{1,2}\s*[/.-]\s*\d{2,4}|\d{4}-\d{1,2}-\d{1,2})\b")
        .expect("valid regex")
});
static CEP_RELAXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}\.?\d{3}-?\d{3}\b").expect("valid regex"));
static PLATE_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z]{3}[\s-]?\d[a-z0-9]\d{2}\b").expect("valid regex")
});
static CURRENCY_RELAXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:R\$\s*)?\b\d{1,3}(?:[.\s]?\d{3})*[.,]\d{2}\b").expect("valid regex")
});
static NUMBER_RELAXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d[\d./-]{2,18}\d\b").expect("valid regex"));

impl Category {
    /// Every category, in lookup-table precedence
    pub const ALL: [Category; 9] = [
        Category::Cpf,
        Category::Cnpj,
        Category::Email,
        Category::Phone,
        Category::Date,
        Category::Cep,
        Category::Plate,
        Category::Currency,
        Category::DocumentNumber,
    ];

    /// Stable category name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpf => "cpf",
            Category::Cnpj => "cnpj",
            Category::Email => "email",
            Category::Phone => "phone",
            Category::Date => "date",
            Category::Cep => "cep",
            Category::Plate => "plate",
            Category::Currency => "currency",
            Category::DocumentNumber => "document_number",
        }
    }

    /// Anchored format pattern used by the heuristic pass
    pub fn strict(&self) -> &'static Regex {
        match self {
            Category::Cpf => &CPF_STRICT,
            Category::Cnpj => &CNPJ_STRICT,
            Category::Email => &EMAIL_STRICT,
            Category::Phone => &PHONE_STRICT,
            Category::Date => &DATE_STRICT,
            Category::Cep => &CEP_STRICT,
            Category::Plate => &PLATE_STRICT,
            Category::Currency => &CURRENCY_STRICT,
            Category::DocumentNumber => &NUMBER_STRICT,
        }
    }

    /// Looser pattern used by recovery (separators optional, spacing tolerated)
    pub fn relaxed(&self) -> &'static Regex {
        match self {
            Category::Cpf => &CPF_RELAXED,
            Category::Cnpj => &CNPJ_RELAXED,
            Category::Email => &EMAIL_RELAXED,
            Category::Phone => &PHONE_RELAXED,
            Category::Date => &DATE_RELAXED,
            Category::Cep => &CEP_RELAXED,
            Category::Plate => &PLATE_RELAXED,
            Category::Currency => &CURRENCY_RELAXED,
            Category::DocumentNumber => &NUMBER_RELAXED,
        }
    }

    /// How much a single strict match of this category can be trusted
    ///
    /// Fully punctuated id/email layouts are near-unambiguous; a bare run
    /// of digits could be almost anything.
    pub fn specificity(&self) -> f64 {
        match self {
            Category::Cpf | Category::Cnpj | Category::Email => 0.95,
            Category::Date | Category::Plate => 0.90,
            Category::Phone | Category::Currency => 0.85,
            Category::Cep => 0.80,
            Category::DocumentNumber => 0.60,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
