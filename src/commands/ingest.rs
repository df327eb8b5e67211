use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;

use crate::gateway::VectorIndex;
use crate::state::AppState;

pub async fn run(state: &AppState, dir: &Path, extensions: &[String], reset: bool) -> Result<ExitCode> {
    info!(dir = %dir.display(), ?extensions, reset, "Ingestion started");

    if reset {
        state.index.delete_all().await?;
        println!("Cleared namespace '{}'", state.config.index.namespace);
    }

    let summary = state.ingestor().ingest_directory(dir, extensions).await?;
    let total = state.index.count().await?;

    info!(
        files = summary.files,
        chunks = summary.chunks,
        failed = summary.failed_chunks,
        "Ingestion complete"
    );
    println!(
        "Ingested {} chunks from {} files ({} failed). Index now holds {} records.",
        summary.chunks, summary.files, summary.failed_chunks, total
    );
    Ok(ExitCode::SUCCESS)
}
