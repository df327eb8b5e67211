mod ask;
mod generate;
mod ingest;
mod search;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::config::AppConfig;
use crate::docs::types::ContextDocument;
use crate::state::AppState;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk, embed and index a knowledge-base directory
    Ingest {
        /// Directory to ingest recursively
        #[arg(long, default_value = "data/knowledge_base")]
        dir: PathBuf,

        /// File extensions to include, comma separated
        #[arg(long, value_delimiter = ',', default_value = ".md,.txt")]
        extensions: Vec<String>,

        /// Delete every indexed record before ingesting
        #[arg(long, default_value_t = false)]
        reset: bool,
    },

    /// Show the documents most similar to a query
    Search {
        query: String,

        /// Number of results (defaults to RETRIEVAL_TOP_K)
        #[arg(long)]
        top_k: Option<usize>,

        /// Only match chunks from this source file
        #[arg(long)]
        source: Option<String>,
    },

    /// Answer a question from the knowledge base
    Ask {
        question: String,

        /// Number of context documents (defaults to RETRIEVAL_TOP_K)
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Generate, validate and export a campaign from a JSON brief
    Generate {
        /// Campaign brief (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Directory for the exported artifacts
        #[arg(long, default_value = "output")]
        output: PathBuf,

        /// Write artifacts even when validation reports issues
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Validate an existing campaign specification
    Validate {
        /// Specification file (JSON)
        spec: PathBuf,

        /// Print the result as JSON instead of a report
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub async fn run(command: Command, config: AppConfig) -> Result<ExitCode> {
    match command {
        // Offline; no gateways needed.
        Command::Validate { spec, json } => validate::run(&spec, json).await,
        Command::Ingest {
            dir,
            extensions,
            reset,
        } => {
            let state = AppState::init(config).await?;
            ingest::run(&state, &dir, &extensions, reset).await
        }
        Command::Search {
            query,
            top_k,
            source,
        } => {
            let state = AppState::init(config).await?;
            search::run(&state, &query, top_k, source).await
        }
        Command::Ask { question, top_k } => {
            let state = AppState::init(config).await?;
            ask::run(&state, &question, top_k).await
        }
        Command::Generate {
            input,
            output,
            force,
        } => {
            let state = AppState::init(config).await?;
            generate::run(&state, &input, &output, force).await
        }
    }
}

fn print_sources(sources: &[ContextDocument]) {
    if sources.is_empty() {
        println!("No context documents retrieved.");
        return;
    }
    for (i, doc) in sources.iter().enumerate() {
        println!("{}. {} (score {:.3})", i + 1, doc.source(), doc.score);
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}
