//! Schema module - what the caller wants extracted

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One requested field: its name and a human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within a schema
    pub name: String,

    /// Description of the expected value (may enumerate allowed values)
    pub description: String,
}

impl FieldSpec {
    /// Create a new field spec
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Reasons a schema can be rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema has no fields
    Empty,

    /// A field name is empty or whitespace
    BlankFieldName,

    /// The same field name appears twice
    DuplicateField(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Empty => write!(f, "schema has no fields"),
            SchemaError::BlankFieldName => write!(f, "schema contains a blank field name"),
            SchemaError::DuplicateField(name) => write!(f, "duplicate field '{}'", name),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Ordered mapping of field name to description
///
/// Construction validates that names are non-blank and unique, so a `Schema`
/// value is always well-formed.
///
/// # Examples
///
/// ```
/// use docsift_domain::{FieldSpec, Schema};
///
/// let schema = Schema::new(vec![
///     FieldSpec::new("cpf", "documento CPF"),
///     FieldSpec::new("nome", "nome completo"),
/// ]).unwrap();
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.description("cpf"), Some("documento CPF"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSpec>", into = "Vec<FieldSpec>")]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Create a schema from an ordered list of fields
    ///
    /// # Errors
    /// Returns error if the list is empty, a name is blank, or a name repeats
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::BlankFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// Build a schema from `(name, description)` pairs
    pub fn from_pairs<I, N, D>(pairs: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, description)| FieldSpec::new(name, description))
                .collect(),
        )
    }

    /// Fields in request order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed schema; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Description of a field, if the field exists
    pub fn description(&self, name: &str) -> Option<&str> {
        self.get(name).map(|f| f.description.as_str())
    }

    /// Whether the schema contains `name`
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in request order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Entries sorted by field name
    ///
    /// This is the canonical order for fingerprinting: two schemas holding
    /// the same entries in different orders yield the same sequence.
    pub fn fingerprint_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.description.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    /// A sub-schema restricted to `names`, keeping request order
    ///
    /// Returns `None` when no requested name is part of the schema.
    pub fn subset<'a, I>(&self, names: I) -> Option<Schema>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: HashSet<&str> = names.into_iter().collect();
        let fields: Vec<FieldSpec> = self
            .fields
            .iter()
            .filter(|f| wanted.contains(f.name.as_str()))
            .cloned()
            .collect();
        Schema::new(fields).ok()
    }
}

impl TryFrom<Vec<FieldSpec>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldSpec>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<FieldSpec> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_schema_creation() {
        let schema = Schema::from_pairs([("cpf", "documento CPF"), ("nome", "nome")]).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.contains("cpf"));
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["cpf", "nome"]);
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert_eq!(Schema::new(vec![]), Err(SchemaError::Empty));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::from_pairs([("cpf", "a"), ("cpf", "b")]);
        assert_eq!(result, Err(SchemaError::DuplicateField("cpf".to_string())));
    }

    #[test]
    fn test_blank_field_rejected() {
        let result = Schema::from_pairs([("  ", "a")]);
        assert_eq!(result, Err(SchemaError::BlankFieldName));
    }

    #[test]
    fn test_subset_keeps_request_order() {
        let schema = Schema::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]).unwrap();
        let sub = schema.subset(["c", "a"]).unwrap();
        assert_eq!(sub.names().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(schema.subset(["zzz"]).is_none());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[{"name":"x","description":"1"},{"name":"x","description":"2"}]"#;
        let parsed: Result<Schema, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn fingerprint_entries_ignore_order(
            names in proptest::collection::hash_set("[a-z]{1,8}", 1..8),
            seed in any::<u64>(),
        ) {
            let fields: Vec<FieldSpec> = names
                .iter()
                .map(|n| FieldSpec::new(n.clone(), format!("desc {}", n)))
                .collect();
            let mut shuffled = fields.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            let a = Schema::new(fields).unwrap();
            let b = Schema::new(shuffled).unwrap();
            prop_assert_eq!(a.fingerprint_entries(), b.fingerprint_entries());
        }
    }
}
