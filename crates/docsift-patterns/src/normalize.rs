//! Lowercasing and diacritic folding with a map back to the source text

use std::ops::Range;

/// Strip the diacritic from an already lowercased Latin letter
fn strip_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Lowercase `ch` and fold away Latin diacritics
///
/// Yields more than one char for the few letters whose lowercase form does.
pub fn fold_char(ch: char) -> impl Iterator<Item = char> {
    ch.to_lowercase().map(strip_diacritic)
}

/// Lowercased, diacritic-free copy of `text`
///
/// ```
/// use docsift_patterns::normalize;
///
/// assert_eq!(normalize("Emissão DATA"), "emissao data");
/// ```
pub fn normalize(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

/// Normalized alphanumeric tokens of `text`
///
/// Splits on anything that is not a letter or digit, so `data_assinatura`
/// and `e-mail` break into their parts.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// A normalized view of a text that remembers where every byte came from
///
/// Searching happens on [`folded`](Self::folded); hits are mapped back with
/// [`to_original`](Self::to_original) so windows and values are cut from the
/// untouched source.
#[derive(Debug, Clone)]
pub struct NormalizedText<'a> {
    original: &'a str,
    folded: String,
    /// Original byte offset of the char that produced each folded byte
    origin: Vec<usize>,
}

impl<'a> NormalizedText<'a> {
    /// Normalize `original` once
    pub fn new(original: &'a str) -> Self {
        let mut folded = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());

        for (pos, ch) in original.char_indices() {
            for out in fold_char(ch) {
                folded.push(out);
                origin.extend(std::iter::repeat(pos).take(out.len_utf8()));
            }
        }

        Self {
            original,
            folded,
            origin,
        }
    }

    /// The source text
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// The normalized text
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Map a byte range of the folded text onto the original text
    ///
    /// The result always lies on char boundaries of the original and covers
    /// every source char that contributed to the range.
    pub fn to_original(&self, range: Range<usize>) -> Range<usize> {
        let Range { start, end } = range;
        if start >= end || start >= self.origin.len() {
            let at = self.origin.get(start).copied().unwrap_or(self.original.len());
            return at..at;
        }

        let begin = self.origin[start];
        let last = self.origin[end.min(self.origin.len()) - 1];
        let last_len = self.original[last..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        begin..last + last_len
    }

    /// Original slice behind a folded byte range
    pub fn original_slice(&self, range: Range<usize>) -> &'a str {
        let mapped = self.to_original(range);
        &self.original[mapped]
    }
}
