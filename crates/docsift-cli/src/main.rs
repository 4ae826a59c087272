//! docsift CLI - Resolve named fields from document text.

use clap::Parser;
use docsift_cli::cli::{ConfigAction, ConfigArgs};
use docsift_cli::commands;
use docsift_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> docsift_cli::Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    // `config init` must work even when the existing file does not parse
    let config = match &cli.command {
        Command::Config(ConfigArgs {
            action: ConfigAction::Init { .. },
        }) => Config::default(),
        _ => Config::load(&path)?,
    };

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await,
        Command::Config(args) => commands::execute_config(args, &config, &path, &formatter),
    }
}
