//! LLM prompt construction for field extraction

use docsift_domain::traits::SemanticRequest;
use docsift_domain::{FieldSpec, TableRow};

/// Table rows beyond this count are left out of the prompt
const MAX_PROMPT_TABLE_ROWS: usize = 50;

/// Builds prompts asking the model for a field → value JSON object
pub struct PromptBuilder<'a> {
    context: &'a str,
    label: &'a str,
    fields: &'a [FieldSpec],
    tables: &'a [TableRow],
}

impl<'a> PromptBuilder<'a> {
    /// Create a prompt builder over a context excerpt
    pub fn new(context: &'a str, label: &'a str) -> Self {
        Self {
            context,
            label,
            fields: &[],
            tables: &[],
        }
    }

    /// Prompt builder for a full semantic request
    pub fn from_request(request: &'a SemanticRequest) -> Self {
        Self::new(&request.context, &request.label)
            .with_fields(&request.fields)
            .with_tables(&request.tables)
    }

    /// Fields the model must fill
    pub fn with_fields(mut self, fields: &'a [FieldSpec]) -> Self {
        self.fields = fields;
        self
    }

    /// Table rows extracted alongside the text
    pub fn with_tables(mut self, tables: &'a [TableRow]) -> Self {
        self.tables = tables;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str(&format!("Document type: {}\n\n", self.label));

        prompt.push_str("Fields:\n");
        for field in self.fields {
            prompt.push_str(&format!("- \"{}\": {}\n", field.name, field.description));
        }
        prompt.push('\n');

        prompt.push_str("Text:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.context);
        prompt.push_str("\n---\n\n");

        if !self.tables.is_empty() {
            prompt.push_str("Extracted tables (one row per line, cells separated by |):\n");
            for row in self.tables.iter().take(MAX_PROMPT_TABLE_ROWS) {
                prompt.push_str(&row.join(" | "));
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        prompt.push_str(&self.output_format());
        prompt
    }

    fn output_format(&self) -> String {
        let keys: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("  \"{}\": \"value or null\"", f.name))
            .collect();
        format!(
            "Output format (one JSON object only, no additional text):\n{{\n{}\n}}",
            keys.join(",\n")
        )
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract the listed fields from the document text below.

Rules:
- Answer with a single JSON object whose keys are exactly the field names
- Copy values as they appear in the text; do not reformat or translate them
- Use null when the text does not contain the value; never guess
- When a description enumerates allowed values, answer with one of them
- A description may end with "(previous example: ...)"; it shows the shape of an
  earlier value for the same field, not the answer"#;
