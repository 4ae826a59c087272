//! Bounded context windows for semantic calls
//!
//! A long document is cut down to the passages around keyword hits so the
//! semantic call sees what matters within a fixed character budget.
//!
//! ```text
//! keywords ─▶ one alternation regex ─▶ hits ─▶ windows ─▶ merge ─▶ select ─▶ join
//! ```

use docsift_domain::FieldSpec;
use docsift_patterns::{tokenize, NormalizedText};
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

/// Marker placed between non-contiguous windows
pub const WINDOW_SEPARATOR: &str = "\n[...]\n";

/// Keyword tokens shorter than this are ignored
const MIN_KEYWORD_CHARS: usize = 3;

/// Builds the context excerpt sent with a semantic call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBuilder {
    radius: usize,
}

/// A stretch of the original text with its selection priority
#[derive(Debug, Clone)]
struct Window {
    span: Range<usize>,
    /// Longest keyword behind the window (chars)
    keyword_len: usize,
    /// Occurrences of that keyword in the whole document
    rarity: usize,
}

impl Window {
    fn absorb(&mut self, other: &Window) {
        self.span.end = self.span.end.max(other.span.end);
        if (other.keyword_len, std::cmp::Reverse(other.rarity))
            > (self.keyword_len, std::cmp::Reverse(self.rarity))
        {
            self.keyword_len = other.keyword_len;
            self.rarity = other.rarity;
        }
    }
}

impl ContextBuilder {
    /// Builder cutting `radius` bytes on each side of a keyword hit
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Window radius in bytes
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Excerpt of `text` for `fields`, at most `max_chars` characters
    ///
    /// Text that already fits is returned unchanged. Otherwise keywords are
    /// taken from field names, descriptions and `hints` (learned examples),
    /// windows are cut around every hit and merged, and the best windows
    /// that fit are joined in document order with [`WINDOW_SEPARATOR`].
    /// Without any usable hit the first `max_chars` characters are returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift_domain::FieldSpec;
    /// use docsift_extractor::ContextBuilder;
    ///
    /// let text = format!("{}CPF: 123.456.789-00{}", "x ".repeat(500), " y".repeat(500));
    /// let fields = [FieldSpec::new("cpf", "documento CPF")];
    /// let context = ContextBuilder::new(20).build(&text, &fields, &[], 200);
    /// assert!(context.contains("CPF: 123.456.789-00"));
    /// assert!(context.chars().count() <= 200);
    /// ```
    pub fn build(&self, text: &str, fields: &[FieldSpec], hints: &[&str], max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let keywords = keywords(fields, hints);
        if keywords.is_empty() {
            return head(text, max_chars);
        }

        let normalized = NormalizedText::new(text);
        let windows = match self.windows(&normalized, &keywords) {
            Some(windows) if !windows.is_empty() => windows,
            _ => {
                debug!(keywords = keywords.len(), "no keyword hit, using document head");
                return head(text, max_chars);
            }
        };

        let merged = merge(windows);
        let selected = select(text, merged, max_chars);
        if selected.is_empty() {
            debug!("no window fits the budget, using document head");
            return head(text, max_chars);
        }

        let parts: Vec<&str> = selected.iter().map(|w| &text[w.span.clone()]).collect();
        let context = parts.join(WINDOW_SEPARATOR);
        debug!(
            windows = parts.len(),
            chars = context.chars().count(),
            budget = max_chars,
            "context built"
        );
        context
    }

    /// One window per keyword occurrence, in document order
    fn windows(&self, normalized: &NormalizedText<'_>, keywords: &[String]) -> Option<Vec<Window>> {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let re = Regex::new(&alternation).ok()?;

        let hits: Vec<(Range<usize>, &str)> = re
            .find_iter(normalized.folded())
            .map(|m| (m.range(), m.as_str()))
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (_, keyword) in &hits {
            *counts.entry(*keyword).or_default() += 1;
        }

        let text = normalized.original();
        let windows = hits
            .iter()
            .map(|(range, keyword)| {
                let original = normalized.to_original(range.clone());
                let mut start = original.start.saturating_sub(self.radius);
                while !text.is_char_boundary(start) {
                    start -= 1;
                }
                let mut end = original.end.saturating_add(self.radius).min(text.len());
                while !text.is_char_boundary(end) {
                    end += 1;
                }
                Window {
                    span: start..end,
                    keyword_len: keyword.chars().count(),
                    rarity: counts.get(keyword).copied().unwrap_or(1),
                }
            })
            .collect();
        Some(windows)
    }
}

/// Normalized keyword tokens, longest first
fn keywords(fields: &[FieldSpec], hints: &[&str]) -> Vec<String> {
    let mut keywords: Vec<String> = fields
        .iter()
        .flat_map(|f| tokenize(&f.name).into_iter().chain(tokenize(&f.description)))
        .chain(hints.iter().flat_map(|h| tokenize(h)))
        .filter(|t| t.chars().count() >= MIN_KEYWORD_CHARS)
        .collect();

    keywords.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    keywords.dedup();
    keywords
}

/// Classic interval merge; overlapping or touching windows become one
fn merge(mut windows: Vec<Window>) -> Vec<Window> {
    windows.sort_by_key(|w| (w.span.start, w.span.end));

    let mut merged: Vec<Window> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.span.start <= last.span.end => last.absorb(&window),
            _ => merged.push(window),
        }
    }
    merged
}

/// Keep the windows that fit, by priority, returned in document order
fn select(text: &str, merged: Vec<Window>, max_chars: usize) -> Vec<Window> {
    let separator = WINDOW_SEPARATOR.chars().count();
    let sizes: Vec<usize> = merged
        .iter()
        .map(|w| text[w.span.clone()].chars().count())
        .collect();

    let total = sizes.iter().sum::<usize>() + separator * merged.len().saturating_sub(1);
    if total <= max_chars {
        return merged;
    }

    let mut order: Vec<usize> = (0..merged.len()).collect();
    order.sort_by(|&a, &b| {
        let (wa, wb) = (&merged[a], &merged[b]);
        wb.keyword_len
            .cmp(&wa.keyword_len)
            .then(wa.rarity.cmp(&wb.rarity))
            .then(wa.span.start.cmp(&wb.span.start))
    });

    let mut used = 0;
    let mut chosen: Vec<usize> = Vec::new();
    for index in order {
        let cost = sizes[index] + if chosen.is_empty() { 0 } else { separator };
        if used + cost <= max_chars {
            used += cost;
            chosen.push(index);
        }
    }
    chosen.sort_unstable();

    let mut merged: Vec<Option<Window>> = merged.into_iter().map(Some).collect();
    chosen
        .into_iter()
        .filter_map(|index| merged[index].take())
        .collect()
}

fn head(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
