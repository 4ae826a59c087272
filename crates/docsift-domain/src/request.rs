//! Extraction request types

use crate::Schema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One table row as extracted by the document provider
pub type TableRow = Vec<String>;

/// Per-request tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    /// Maximum characters of context sent to the semantic extractor
    pub context_budget: usize,

    /// Maximum per-field recovery tasks running at once
    pub max_recovery_fanout: usize,

    /// Wall-clock cap for one field's recovery phase
    #[serde(with = "duration_ms")]
    pub field_timeout: Duration,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            context_budget: 2_500,
            max_recovery_fanout: 8,
            field_timeout: Duration::from_secs(20),
        }
    }
}

/// A request to resolve the fields of `schema` from `text`
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Document-type identifier, keys learned profiles
    pub label: String,

    /// Fields to resolve
    pub schema: Schema,

    /// Plain document text
    pub text: String,

    /// Table rows extracted alongside the text (may be empty)
    pub tables: Vec<TableRow>,

    /// Tuning knobs
    pub options: ExtractionOptions,
}

impl ExtractionRequest {
    /// Create a request with no tables and default options
    pub fn new(label: impl Into<String>, schema: Schema, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            schema,
            text: text.into(),
            tables: Vec::new(),
            options: ExtractionOptions::default(),
        }
    }

    /// Attach table rows
    pub fn with_tables(mut self, tables: Vec<TableRow>) -> Self {
        self.tables = tables;
        self
    }

    /// Override the options
    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
