//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docsift - Resolve named fields from document text.
#[derive(Debug, Parser)]
#[command(name = "docsift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DOCSIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log pipeline details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (field=value lines)
    Quiet,
}

/// Provider options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// Local Ollama server
    Ollama,
    /// Null answers, heuristics only
    Mock,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract fields from one or more documents
    Extract(ExtractArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document type label
    #[arg(short, long)]
    pub label: String,

    /// JSON object mapping field names to descriptions
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Plain-text document (repeatable; documents share the cache and learner)
    #[arg(short, long = "document", required = true)]
    pub documents: Vec<PathBuf>,

    /// JSON array of table rows (arrays of strings)
    #[arg(short, long)]
    pub tables: Option<PathBuf>,

    /// Semantic provider, overrides the config file
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Include pipeline metadata in table output
    #[arg(long)]
    pub metadata: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<ProviderArg> for crate::config::ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Ollama => crate::config::ProviderKind::Ollama,
            ProviderArg::Mock => crate::config::ProviderKind::Mock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputFormat, ProviderKind};

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from([
            "docsift",
            "extract",
            "--label",
            "id-card",
            "--schema",
            "schema.json",
            "--document",
            "a.txt",
            "--document",
            "b.txt",
            "--provider",
            "mock",
        ]);
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.label, "id-card");
                assert_eq!(args.documents.len(), 2);
                assert_eq!(args.provider, Some(ProviderArg::Mock));
                assert!(args.tables.is_none());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_requires_document() {
        let parsed = Cli::try_parse_from([
            "docsift", "extract", "--label", "x", "--schema", "s.json",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::parse_from(["docsift", "config", "init", "--force"]);
        match cli.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { force },
            }) => assert!(force),
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["docsift", "-q", "-v", "config", "show"]).is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(OutputFormat::from(CliFormat::Json), OutputFormat::Json);
        assert_eq!(ProviderKind::from(ProviderArg::Mock), ProviderKind::Mock);
    }
}
