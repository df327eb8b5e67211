use std::process::ExitCode;

use anyhow::Result;
use serde_json::Value;

use crate::gateway::MetadataFilter;
use crate::state::AppState;

pub async fn run(state: &AppState, query: &str, top_k: Option<usize>, source: Option<String>) -> Result<ExitCode> {
    let top_k = top_k.unwrap_or(state.config.retrieval.top_k);
    let filter: Option<MetadataFilter> =
        source.map(|s| MetadataFilter::from([("source".to_string(), Value::String(s))]));

    let docs = state.rag.retriever().retrieve(query, top_k, filter.as_ref()).await;
    if docs.is_empty() {
        println!("No matching documents.");
        return Ok(ExitCode::SUCCESS);
    }

    for (i, doc) in docs.iter().enumerate() {
        let title = doc.metadata.get("title").and_then(Value::as_str).unwrap_or("");
        println!("{}. [{:.3}] {} {}", i + 1, doc.score, doc.source(), title);
        println!("   {}", super::preview(&doc.text, 200));
    }
    Ok(ExitCode::SUCCESS)
}
