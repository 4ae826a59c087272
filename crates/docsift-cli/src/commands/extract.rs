//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::{Config, ProviderKind};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use docsift_domain::traits::SemanticExtractor;
use docsift_domain::{ExtractionRequest, ExtractionResponse, Schema, TableRow};
use docsift_extractor::{ExtractorConfig, Orchestrator};
use docsift_llm::{MockProvider, OllamaProvider};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let tables = match &args.tables {
        Some(path) => load_tables(path)?,
        None => Vec::new(),
    };
    let documents = load_documents(&args.documents)?;

    let kind = args.provider.map(Into::into).unwrap_or(config.provider.kind);
    info!(provider = ?kind, documents = documents.len(), "starting extraction");

    let responses = match kind {
        ProviderKind::Ollama => {
            let provider = OllamaProvider::with_timeout(
                config.provider.endpoint.clone(),
                config.provider.model.clone(),
                Duration::from_secs(config.provider.timeout_secs),
            )?;
            extract_all(provider, &config.extractor, &args.label, &schema, &tables, documents)
                .await?
        }
        ProviderKind::Mock => {
            extract_all(
                MockProvider::new(),
                &config.extractor,
                &args.label,
                &schema,
                &tables,
                documents,
            )
            .await?
        }
    };

    println!("{}", formatter.format_responses(&responses, args.metadata)?);
    Ok(())
}

/// Run every document through one orchestrator, so later documents see the
/// cache and learned examples of earlier ones.
pub async fn extract_all<L>(
    extractor: L,
    extractor_config: &ExtractorConfig,
    label: &str,
    schema: &Schema,
    tables: &[TableRow],
    documents: Vec<(String, String)>,
) -> Result<Vec<(String, ExtractionResponse)>>
where
    L: SemanticExtractor + 'static,
{
    let orchestrator = Orchestrator::from_config(extractor, extractor_config.clone())?;
    let options = extractor_config.default_options();

    let mut responses = Vec::with_capacity(documents.len());
    for (name, text) in documents {
        let request = ExtractionRequest::new(label, schema.clone(), text)
            .with_tables(tables.to_vec())
            .with_options(options.clone());
        let response = orchestrator.extract(request).await?;
        responses.push((name, response));
    }
    Ok(responses)
}

/// Parse a schema file: a JSON object of field name to description, in
/// file order.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let contents = fs::read_to_string(path)?;
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&contents)?;

    let mut pairs = Vec::with_capacity(object.len());
    for (name, description) in object {
        let serde_json::Value::String(description) = description else {
            return Err(CliError::InvalidInput(format!(
                "description of field '{}' must be a string",
                name
            )));
        };
        pairs.push((name, description));
    }

    Schema::from_pairs(pairs).map_err(|e| CliError::InvalidInput(e.to_string()))
}

/// Parse a tables file: a JSON array of rows, each an array of strings.
pub fn load_tables(path: &Path) -> Result<Vec<TableRow>> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        CliError::InvalidInput(format!(
            "{}: expected an array of string arrays ({})",
            path.display(),
            e
        ))
    })
}

fn load_documents(paths: &[PathBuf]) -> Result<Vec<(String, String)>> {
    paths
        .iter()
        .map(|path| Ok((path.display().to_string(), fs::read_to_string(path)?)))
        .collect()
}
