//! Keyword → category lookup and enumerated-value cues

use crate::category::Category;
use crate::normalize::{normalize, tokenize};
use regex::Regex;
use std::sync::LazyLock;

/// Where a keyword may appear to assign its category
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Field names only; in prose the word is too loose
    Name,
    /// Field names or descriptions
    Anywhere,
}

/// Static keyword table, matched against normalized field-name and
/// description tokens
const KEYWORDS: &[(&str, Category, Scope)] = &[
    ("cpf", Category::Cpf, Scope::Anywhere),
    ("cadastro", Category::Cpf, Scope::Name),
    ("cnpj", Category::Cnpj, Scope::Anywhere),
    ("email", Category::Email, Scope::Anywhere),
    ("mail", Category::Email, Scope::Anywhere),
    ("telefone", Category::Phone, Scope::Anywhere),
    ("celular", Category::Phone, Scope::Anywhere),
    ("fone", Category::Phone, Scope::Name),
    ("phone", Category::Phone, Scope::Anywhere),
    ("data", Category::Date, Scope::Anywhere),
    ("nascimento", Category::Date, Scope::Name),
    ("emissao", Category::Date, Scope::Name),
    ("vencimento", Category::Date, Scope::Name),
    ("validade", Category::Date, Scope::Name),
    ("date", Category::Date, Scope::Anywhere),
    ("cep", Category::Cep, Scope::Anywhere),
    ("placa", Category::Plate, Scope::Name),
    ("plate", Category::Plate, Scope::Name),
    ("valor", Category::Currency, Scope::Name),
    ("total", Category::Currency, Scope::Name),
    ("preco", Category::Currency, Scope::Name),
    ("amount", Category::Currency, Scope::Name),
    ("price", Category::Currency, Scope::Name),
    ("numero", Category::DocumentNumber, Scope::Anywhere),
    ("documento", Category::DocumentNumber, Scope::Anywhere),
    ("inscricao", Category::DocumentNumber, Scope::Anywhere),
    ("registro", Category::DocumentNumber, Scope::Anywhere),
    ("number", Category::DocumentNumber, Scope::Anywhere),
];

/// Phrases announcing a closed set of allowed values (already normalized)
pub const ENUM_CUES: &[&str] = &["pode ser", "can be", "opcoes", "options", "um dos", "one of"];

const OPTION_TRIM: &[char] = &['.', ':', '-', '"', '\''];

static OPTION_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",|/|;|\s+ou\s+|\s+or\s+").expect("valid regex"));

/// Format categories of a field, in table order, without duplicates
///
/// The field name decides first. Only when the name carries no specific
/// category do description tokens count, and then only keywords that name a
/// format outright ("cpf", "email", "data", ...). `DocumentNumber` is a
/// fallback: it is returned alone, and only when nothing more specific
/// applies.
///
/// ```
/// use docsift_patterns::{categories_for, Category};
///
/// assert_eq!(categories_for("cpf", "documento CPF"), vec![Category::Cpf]);
/// assert_eq!(categories_for("contato", "telefone fixo"), vec![Category::Phone]);
/// assert!(categories_for("nome", "nome conforme cadastro").is_empty());
/// assert_eq!(categories_for("rg", "numero do documento"), vec![Category::DocumentNumber]);
/// ```
pub fn categories_for(name: &str, description: &str) -> Vec<Category> {
    let name_tokens = tokenize(name);
    let description_tokens = tokenize(description);

    let from_name = matching(&name_tokens, |_| true);
    if !from_name.is_empty() {
        return from_name;
    }
    let from_description = matching(&description_tokens, |scope| scope == Scope::Anywhere);
    if !from_description.is_empty() {
        return from_description;
    }

    let generic = |tokens: &[String]| {
        KEYWORDS.iter().any(|(keyword, category, _)| {
            *category == Category::DocumentNumber && tokens.iter().any(|t| t == keyword)
        })
    };
    if generic(&name_tokens) || generic(&description_tokens) {
        vec![Category::DocumentNumber]
    } else {
        Vec::new()
    }
}

/// Specific categories whose keywords appear among `tokens`
fn matching(tokens: &[String], allowed: impl Fn(Scope) -> bool) -> Vec<Category> {
    let mut categories = Vec::new();
    for (keyword, category, scope) in KEYWORDS {
        if *category == Category::DocumentNumber || !allowed(*scope) {
            continue;
        }
        if tokens.iter().any(|t| t == keyword) && !categories.contains(category) {
            categories.push(*category);
        }
    }
    categories
}

/// Closed set of values enumerated by `description`, normalized
///
/// Recognizes descriptions such as "pode ser PF, PJ ou MEI" or "one of: red /
/// green / blue". Returns `None` when no cue is present or no option
/// survives cleanup.
///
/// # Examples
///
/// ```
/// use docsift_patterns::enum_options;
///
/// let options = enum_options("Tipo de pessoa, pode ser PF, PJ ou MEI").unwrap();
/// assert_eq!(options, vec!["pf", "pj", "mei"]);
/// assert!(enum_options("nome completo").is_none());
/// ```
pub fn enum_options(description: &str) -> Option<Vec<String>> {
    let folded = normalize(description);
    let start = ENUM_CUES
        .iter()
        .filter_map(|cue| folded.find(cue).map(|pos| pos + cue.len()))
        .min()?;

    let tail = folded[start..]
        .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace());
    let end = [tail.find(['\n', ')', '(']), tail.find(". ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(tail.len());
    let tail = &tail[..end];

    let mut options: Vec<String> = Vec::new();
    for raw in OPTION_SPLIT.split(tail) {
        let option = raw.trim_matches(|c: char| OPTION_TRIM.contains(&c) || c.is_whitespace());
        let option = option
            .strip_prefix("ou ")
            .or_else(|| option.strip_prefix("or "))
            .unwrap_or(option)
            .trim();
        if option.is_empty() || option == "etc" || options.iter().any(|o| o == option) {
            continue;
        }
        options.push(option.to_string());
    }

    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_from_name() {
        assert_eq!(categories_for("cpf", ""), vec![Category::Cpf]);
        assert_eq!(categories_for("data_assinatura", "data de assinatura"), vec![Category::Date]);
        assert_eq!(categories_for("e-mail", "contato"), vec![Category::Email]);
    }

    #[test]
    fn test_specific_category_suppresses_document_number() {
        assert_eq!(categories_for("cpf", "documento CPF"), vec![Category::Cpf]);
        assert_eq!(categories_for("telefone", "numero de telefone"), vec![Category::Phone]);
    }

    #[test]
    fn test_name_decides_before_description() {
        assert_eq!(categories_for("vencimento", "valor a pagar ate a data"), vec![Category::Date]);
        assert_eq!(categories_for("contato", "telefone fixo"), vec![Category::Phone]);
    }

    #[test]
    fn test_loose_description_words_assign_nothing() {
        assert!(categories_for("nome", "nome do titular conforme cadastro").is_empty());
        assert!(categories_for("descricao", "descrição do serviço, sem o valor total").is_empty());
        assert!(categories_for("observacao", "validade e placa, se houver").is_empty());
    }

    #[test]
    fn test_document_number_fallback() {
        assert_eq!(categories_for("rg", "numero do documento"), vec![Category::DocumentNumber]);
        assert_eq!(categories_for("numero_registro", ""), vec![Category::DocumentNumber]);
    }

    #[test]
    fn test_categories_fold_diacritics() {
        assert_eq!(categories_for("emissão", ""), vec![Category::Date]);
        assert_eq!(categories_for("preço", ""), vec![Category::Currency]);
    }

    #[test]
    fn test_no_categories_for_free_text() {
        assert!(categories_for("nome", "nome completo do titular").is_empty());
    }

    #[test]
    fn test_enum_options_english() {
        let options = enum_options("Color. Can be red, green, or blue.").unwrap();
        assert_eq!(options, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_enum_options_slash_and_colon() {
        let options = enum_options("Situação, opções: ativo / inativo / suspenso").unwrap();
        assert_eq!(options, vec!["ativo", "inativo", "suspenso"]);
    }

    #[test]
    fn test_enum_options_drop_etc_and_duplicates() {
        let options = enum_options("one of A, B, A, etc").unwrap();
        assert_eq!(options, vec!["a", "b"]);
    }

    #[test]
    fn test_enum_options_stop_at_sentence_end() {
        let options = enum_options("pode ser sim ou nao. Preencher sempre").unwrap();
        assert_eq!(options, vec!["sim", "nao"]);
    }

    #[test]
    fn test_no_cue_no_options() {
        assert!(enum_options("data de assinatura").is_none());
        assert!(enum_options("pode ser").is_none());
    }
}
