mod artifacts;
mod commands;
mod config;
mod docs;
mod error;
mod gateway;
mod llm;
mod rag;
mod state;
mod validate;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::Command;
use config::AppConfig;

/// Retrieval-augmented ad campaign generator
#[derive(Parser, Debug)]
#[command(name = "adforge", version)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load env
    let _ = dotenv::dotenv();
    let config = AppConfig::from_env()?;
    info!(
        index = %config.index.data_dir.display(),
        namespace = %config.index.namespace,
        "Configuration loaded"
    );

    commands::run(cli.command, config).await
}
