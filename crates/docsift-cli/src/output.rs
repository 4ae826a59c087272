//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use docsift_domain::{ExtractionResponse, ValidationStatus};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the responses of one extract run, keyed by document name.
    pub fn format_responses(
        &self,
        responses: &[(String, ExtractionResponse)],
        with_metadata: bool,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_json(responses),
            OutputFormat::Table => Ok(self.format_tables(responses, with_metadata)),
            OutputFormat::Quiet => Ok(self.format_quiet(responses)),
        }
    }

    fn format_json(&self, responses: &[(String, ExtractionResponse)]) -> Result<String> {
        let documents: Vec<serde_json::Value> = responses
            .iter()
            .map(|(document, response)| {
                serde_json::json!({
                    "document": document,
                    "values": response.result.values(),
                    "result": response.result,
                    "metadata": response.metadata,
                })
            })
            .collect();

        Ok(serde_json::to_string_pretty(&documents)?)
    }

    fn format_tables(
        &self,
        responses: &[(String, ExtractionResponse)],
        with_metadata: bool,
    ) -> String {
        let mut sections = Vec::with_capacity(responses.len());
        for (document, response) in responses {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value", "Source", "Confidence", "Validation"]);

            for candidate in &response.result.fields {
                let source = response
                    .effective_source(&candidate.field)
                    .unwrap_or(candidate.source);
                builder.push_record([
                    candidate.field.clone(),
                    candidate.value.clone().unwrap_or_else(|| "-".to_string()),
                    source.to_string(),
                    format!("{:.2}", candidate.confidence.value()),
                    validation_label(&candidate.validation),
                ]);
            }

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));

            let mut section = format!("{}\n{}", self.colorize(document, "cyan"), table);
            if with_metadata {
                section.push('\n');
                section.push_str(&self.metadata_line(response));
            }
            for failure in &response.metadata.failures {
                section.push('\n');
                section.push_str(&self.warning(failure));
            }
            sections.push(section);
        }
        sections.join("\n\n")
    }

    fn format_quiet(&self, responses: &[(String, ExtractionResponse)]) -> String {
        let mut lines = Vec::new();
        for (_, response) in responses {
            for candidate in &response.result.fields {
                lines.push(format!(
                    "{}={}",
                    candidate.field,
                    candidate.value.as_deref().unwrap_or("")
                ));
            }
        }
        lines.join("\n")
    }

    fn metadata_line(&self, response: &ExtractionResponse) -> String {
        let meta = &response.metadata;
        self.info(&format!(
            "request {} | cache hit: {} | semantic calls: {} (recovery {}) | tokens: {} | {} ms",
            meta.request_id,
            meta.cache_hit,
            meta.semantic_calls,
            meta.recovery_semantic_calls,
            meta.usage.total_tokens,
            meta.total_ms
        ))
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn validation_label(status: &ValidationStatus) -> String {
    match status {
        ValidationStatus::Accepted => "accepted".to_string(),
        ValidationStatus::Rejected { reason } => format!("rejected: {}", reason),
        ValidationStatus::NotChecked => "not checked".to_string(),
    }
}
