use std::process::ExitCode;

use anyhow::Result;
use tracing::info;

use crate::state::AppState;

pub async fn run(state: &AppState, question: &str, top_k: Option<usize>) -> Result<ExitCode> {
    let top_k = top_k.unwrap_or(state.config.retrieval.top_k);
    info!(question, top_k, "Question started");

    let answer = state.rag.ask(question, top_k).await?;

    info!(
        answer_len = answer.text.len(),
        sources = answer.sources.len(),
        "Question answered"
    );
    println!("{}\n", answer.text.trim());
    println!("Sources:");
    super::print_sources(&answer.sources);
    Ok(ExitCode::SUCCESS)
}
